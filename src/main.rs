use vitrine::app;
use vitrine::loader::AssetSources;

fn main() -> anyhow::Result<()> {
    app::run(AssetSources::default())
}
