// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    // Using a raw string literal for the multi-line banner
    let banner = r#"
  ___  ___  ___ ___ ___
 / __|| _ \/   \   \ __|
| (_ ||   /| - | |) | _|
 \___||_|_\|_|_|___/___|

    Doctest exercises & quiz grading
"#;
    println!("{}", banner);
}
