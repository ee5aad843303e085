fn main() {
    if let Err(err) = labelgrid::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
