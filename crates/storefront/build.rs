//! Build script for storefront crate.
//!
//! Fingerprints the stylesheet so `/static/css/derived/main.<hash>.css` can be
//! served with long cache lifetimes.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    fingerprint_stylesheet();
}

/// Hash `static/css/main.css` and copy it next to itself with the hash in the
/// filename. Exposes the short hash as `CSS_HASH`.
fn fingerprint_stylesheet() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=CSS_HASH=");
        return;
    };
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = match fs::read(&css_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read main.css: {e}");
            println!("cargo:rustc-env=CSS_HASH=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short_hash: String = digest.chars().take(8).collect();

    let derived_dir = Path::new(&manifest_dir).join("static/css/derived");
    let copied = fs::create_dir_all(&derived_dir)
        .and_then(|()| fs::copy(&css_path, derived_dir.join(format!("main.{short_hash}.css"))));

    match copied {
        Ok(_) => println!("cargo:rustc-env=CSS_HASH={short_hash}"),
        Err(e) => {
            // Fall back to the unhashed stylesheet.
            println!("cargo:warning=Could not write fingerprinted CSS: {e}");
            println!("cargo:rustc-env=CSS_HASH=");
        }
    }
}
