use std::{env, fs, path::PathBuf};
use walkdir::WalkDir;

const PROTO_FILES: [&str; 2] = ["lightning.proto", "walletunlocker.proto"];

fn main() {
    // Build the lnrpc Lightning + WalletUnlocker client from the latest vendored tag
    let protos_root = PathBuf::from("protos/lnd");

    // Deterministically select a tag directory, or use LND_TAG if provided.
    let tag = env::var("LND_TAG").ok().or_else(|| {
        // Collect immediate child directories and sort lexicographically; pick the last.
        let mut dirs: Vec<String> = WalkDir::new(&protos_root)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path() != protos_root && e.file_type().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        dirs.sort();
        dirs.pop()
    });

    let Some(tag) = tag else {
        panic!("no LND proto tag found under {}", protos_root.display());
    };

    let proto_dir = protos_root.join(&tag);
    println!("cargo:rerun-if-env-changed=LND_TAG");
    println!("cargo:rerun-if-changed={}", proto_dir.display());

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::create_dir_all(&out_dir).expect("create OUT_DIR");

    let protos: Vec<PathBuf> = PROTO_FILES.iter().map(|f| proto_dir.join(f)).collect();
    for proto in &protos {
        assert!(proto.exists(), "expected {} but it was not found", proto.display());
    }

    let serde_attr = "#[derive(serde::Serialize, serde::Deserialize)]";
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .out_dir(&out_dir)
        .type_attribute(".lnrpc", serde_attr)
        .compile_protos(&protos, &[proto_dir])
        .unwrap_or_else(|e| panic!("proto compile failed: {e}"));
}
