fn main() -> anyhow::Result<()> {
    mindmend::cli::run()
}
