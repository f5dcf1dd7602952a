//! Shared helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PLUGIN_SCRIPT: &str =
    "node_modules/@react-native/gradle-plugin/react-native-gradle-plugin/build.gradle.kts";

pub const GRADLE_PROPERTIES: &str = "org.gradle.jvmargs=-Xmx4096m\n\
android.useAndroidX=true\n\
hermesEnabled=true\n";

pub const ROOT_BUILD_GRADLE: &str = r#"// Top-level build file
buildscript {
    ext {
        buildToolsVersion = "34.0.0"
        sourceCompatibility = JavaVersion.VERSION_17
    }
    repositories {
        google()
        mavenCentral()
    }
}

sourceCompatibility = JavaVersion.VERSION_1_8
targetCompatibility = JavaVersion.VERSION_1_8

allprojects {
    repositories {
        google()
    }
}

apply plugin: "expo-root-project"
apply plugin: "com.facebook.react.rootproject"
"#;

pub const APP_BUILD_GRADLE: &str = r#"apply plugin: "com.android.application"

android {
    ndkVersion rootProject.ext.ndkVersion
    namespace 'com.example.app'
    defaultConfig {
        applicationId 'com.example.app'
    }
}
"#;

pub const WRAPPER_PROPERTIES: &str = "distributionBase=GRADLE_USER_HOME\n\
distributionUrl=https\\://services.gradle.org/distributions/gradle-6.9.4-all.zip\n";

pub const PLUGIN_KTS: &str = r#"tasks.withType<KotlinCompile>().configureEach {
    kotlinOptions {
        allWarningsAsErrors =
            project.properties["enableWarningsAsErrors"]?.toString()?.toBoolean() ?: false
    }
}
"#;

pub fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
    fs::write(&path, content).expect("write file");
    path
}

/// React Native project with `package.json` only (before prebuild)
pub fn create_js_project(dir: &TempDir) -> PathBuf {
    let root = dir.path().to_path_buf();
    write(
        &root,
        "package.json",
        "{\n  \"name\": \"example-app\",\n  \"dependencies\": {\n    \"react-native\": \"0.76.0\"\n  }\n}\n",
    );
    root
}

/// Writes the generated Android tree and the Gradle plugin sources.
pub fn add_android_project(root: &Path) {
    write(root, "android/gradle.properties", GRADLE_PROPERTIES);
    write(root, "android/build.gradle", ROOT_BUILD_GRADLE);
    write(root, "android/app/build.gradle", APP_BUILD_GRADLE);
    write(
        root,
        "android/gradle/wrapper/gradle-wrapper.properties",
        WRAPPER_PROPERTIES,
    );
    write(root, PLUGIN_SCRIPT, PLUGIN_KTS);
}

/// Full project: JS side plus the generated Android tree
pub fn create_rn_project(dir: &TempDir) -> PathBuf {
    let root = create_js_project(dir);
    add_android_project(&root);
    root
}

pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read file")
}
