//! Embeds build metadata (timestamp, rustc version, target triple) into the
//! binary for `--version` output.

use vergen_gix::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};

fn main() {
    let mut emitter = Emitter::default();

    // Missing metadata downgrades --version detail, never the build.
    if let Ok(build) = BuildBuilder::default().build_timestamp(true).build() {
        let _ = emitter.add_instructions(&build);
    }
    if let Ok(cargo) = CargoBuilder::default().target_triple(true).build() {
        let _ = emitter.add_instructions(&cargo);
    }
    if let Ok(rustc) = RustcBuilder::default().semver(true).build() {
        let _ = emitter.add_instructions(&rustc);
    }

    if let Err(e) = emitter.emit() {
        eprintln!("cargo:warning=vergen emit failed: {e}");
    }
}
