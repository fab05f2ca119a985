fn main() {
    #[cfg(feature = "cli")]
    dhp2::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("dhp2: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
