// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Build Script for aegis-component-sdk
//!
//! Compiles the component service Protocol Buffer definitions into Rust
//! client and server stubs.
//!
//! # Compilation Targets
//!
//! - **AEGIS Component**: `../proto/aegis_component.proto`
//!
//! Generated code is placed in `OUT_DIR` and included via
//! `tonic::include_proto!` in `src/presentation/grpc/mod.rs`.
//!
//! # Dependencies
//!
//! - **protoc**: Protocol buffer compiler (vendored via `protoc-bin-vendored`)
//! - **tonic-prost-build**: Code generator for Rust gRPC stubs

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point PROTOC at the vendored binary so builds need no system protoc
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../proto/aegis_component.proto"], &["../proto"])?;

    println!("cargo:rerun-if-changed=../proto/aegis_component.proto");

    Ok(())
}
