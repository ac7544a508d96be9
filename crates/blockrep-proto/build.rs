fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile protobuf definitions
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/blockstore.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/blockstore.proto");
    Ok(())
}
