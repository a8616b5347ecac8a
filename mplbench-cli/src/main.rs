fn main() {
    if let Err(e) = mplbench_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
