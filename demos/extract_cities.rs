use bioclim::{Bioclim, BioclimError, CrsDataPoint, Dataset, ExtractError};
use std::env;

#[tokio::main]
async fn main() -> Result<(), BioclimError> {
    configure_polars_display();
    let client = Bioclim::new().await?;
    client.download().dataset(Dataset::Chelsa).call().await?;

    let points = vec![
        CrsDataPoint::new("Sherbrooke", 3857, -8002765.769038227, 5683742.6823244635)?,
        CrsDataPoint::new("Paris", 4326, 2.346963, 48.858885)?,
        CrsDataPoint::new("Nairobi", 4326, 36.817223, -1.286389)?,
    ];

    let set = client
        .extract()
        .dataset(Dataset::Chelsa)
        .points(&points)
        .call()
        .await?;

    let frame = set.to_dataframe().map_err(ExtractError::from)?;
    println!("{frame}");

    set.write_csv("bioclim_cities.csv").map_err(BioclimError::from)?;
    println!("Wrote bioclim_cities.csv");

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
