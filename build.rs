fn main() {
    println!("cargo:rerun-if-env-changed=SMARTPLANT_CLOUD_HOST");
    println!("cargo:rerun-if-env-changed=SMARTPLANT_CLOUD_AUTH");

    // Host builds (tests, fuzzing) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
