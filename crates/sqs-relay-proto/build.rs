//! Generates the relay messages and the `QueueRelay` client and server stubs
//! from `proto/sqs_relay.proto`.
//!
//! Uses the vendored `protoc` so no system install is needed.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/");

    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/sqs_relay.proto"], &["proto/"])?;

    Ok(())
}
