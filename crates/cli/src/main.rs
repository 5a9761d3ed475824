fn main() {
    if let Err(err) = smaliscope_cli::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
