//! Slug generation for new products.

use dram_core::slugify;

/// Print the slug for `text`.
#[allow(clippy::print_stdout)]
pub fn run(text: &str) {
    println!("{}", slugify(text));
}
