fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile the proto files via `prost`, generating service stubs
    // and proto definitions for use with `tonic`.
    tonic_build::compile_protos("../protos/coordinator.proto")?;
    Ok(())
}
