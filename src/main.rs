fn main() -> anyhow::Result<()> {
    drydock::run()
}
