fn main() {
    println!("cargo:rerun-if-changed=proto/metrics.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/metrics.proto"], &["proto"])
        .expect("failed to compile proto/metrics.proto");
}
