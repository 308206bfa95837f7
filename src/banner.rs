// src/banner.rs

/// Prints the startup banner. Goes to stderr so program output stays clean on stdout.
pub fn print_banner() {
    let banner = r#"
   _           _              _     _
  (_)_   _  __| | __ _  ___  (_) __| | ___
  | | | | |/ _` |/ _` |/ _ \ | |/ _` |/ _ \
  | | |_| | (_| | (_| |  __/ | | (_| |  __/
 _/ |\__,_|\__,_|\__, |\___| |_|\__,_|\___|
|__/             |___/

    Run code on the judge from your terminal
"#;
    eprintln!("{}", banner);
}
