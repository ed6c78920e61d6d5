fn main() {
    if let Err(err) = intimation_desk::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
