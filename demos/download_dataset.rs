use bioclim::{Bioclim, BioclimError, Dataset};

#[tokio::main]
async fn main() -> Result<(), BioclimError> {
    let client = Bioclim::new().await?;
    println!("Downloading into {}", client.cache_folder().display());

    // Fetches the 19 CHELSA bioclim rasters plus the WorldClim elevation
    // layer. Rasters already in the cache are skipped, so this is safe to
    // re-run after an interrupted download.
    let fetched = client.download().dataset(Dataset::Chelsa).call().await?;
    println!("Fetched {fetched} files.");

    Ok(())
}
