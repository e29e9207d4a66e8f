fn main() -> anyhow::Result<()> {
    notedash::cli::run()
}
