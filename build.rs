use std::path::{Path, PathBuf};
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = Path::new("proto");
    let proto_file = proto_dir.join("classifier.proto");
    println!("cargo:rerun-if-changed={}", proto_file.display());
    println!("cargo:rerun-if-env-changed=PROTOC");

    // Descriptors are produced here so a system protoc is optional.
    let protoc = match std::env::var_os("PROTOC") {
        Some(path) => PathBuf::from(path),
        None => protoc_bin_vendored::protoc_bin_path()?,
    };
    let descriptor_path = PathBuf::from(std::env::var("OUT_DIR")?).join("classifier_descriptor.bin");
    let status = Command::new(&protoc)
        .arg("--include_imports")
        .arg("--proto_path")
        .arg(proto_dir)
        .arg("--descriptor_set_out")
        .arg(&descriptor_path)
        .arg(&proto_file)
        .status()?;
    if !status.success() {
        return Err(format!("{} failed with {status}", protoc.display()).into());
    }

    tonic_build::configure()
        .file_descriptor_set_path(&descriptor_path)
        .skip_protoc_run()
        .compile(&[&proto_file], &[proto_dir])
        .map_err(|e| {
            eprintln!("Failed to compile protos: {}", e);
            e
        })?;
    Ok(())
}
