//! Name-derivation properties across code reference shapes.
//!
//! Each `#[case]` is isolated: no shared state.

use offload_core::{
    naming::{derive_function_name, is_floating_tag},
    types::{CodeReference, ContentAddress, PackagedArchive},
};
use rstest::rstest;
use std::path::PathBuf;

fn image(uri: &str) -> CodeReference {
    CodeReference::ContainerImage {
        uri: uri.to_string(),
    }
}

fn archive(key: &str, hash: &str) -> CodeReference {
    CodeReference::PackagedArchive(PackagedArchive {
        content_hash: ContentAddress::new(hash),
        path: PathBuf::from("runtime.zip"),
        key: key.to_string(),
        runtime: "java21".to_string(),
        handler: "Handler".to_string(),
    })
}

#[rstest]
#[case::tag_change(image("repo/app:v1"), image("repo/app:v2"))]
#[case::case_and_scheme(image("https://REPO/App:v1"), image("repo/app:latest"))]
#[case::digest(image("repo/app@sha256:0123"), image("repo/app"))]
#[case::archive_hash_change(archive("runtime/r.zip", "abc"), archive("runtime/r.zip", "def"))]
#[case::archive_key_slashes(archive("/runtime/r.zip/", "abc"), archive("runtime/r.zip", "abc"))]
fn same_logical_deployable_shares_a_name(#[case] a: CodeReference, #[case] b: CodeReference) {
    assert_eq!(derive_function_name(&a), derive_function_name(&b));
}

#[rstest]
#[case::different_repo(image("repo/app:v1"), image("repo/api:v1"))]
#[case::different_registry(image("a.example/app:v1"), image("b.example/app:v1"))]
#[case::different_key(archive("runtime/a.zip", "abc"), archive("runtime/b.zip", "abc"))]
#[case::image_vs_archive(image("runtime/r.zip"), archive("runtime/r.zip", "abc"))]
fn distinct_deployables_never_collide(#[case] a: CodeReference, #[case] b: CodeReference) {
    assert_ne!(derive_function_name(&a), derive_function_name(&b));
}

#[rstest]
#[case("repo/app:latest", true)]
#[case("repo/app", true)]
#[case("localhost:5000/app", true)]
#[case("localhost:5000/app:1.2", false)]
#[case("repo/app@sha256:0123", false)]
fn floating_tag_detection(#[case] uri: &str, #[case] floating: bool) {
    assert_eq!(is_floating_tag(uri), floating);
}
