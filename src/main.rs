use std::path::PathBuf;
use std::process;

use clap::Parser;

use eavesight::collect::nominatim::{GeocoderConfig, NominatimGeocoder};
use eavesight::{render, FootprintConfig, FootprintError, FootprintLoader};

#[derive(Parser)]
#[command(name = "eavesight")]
#[command(about = "Estimate eavestrough length from the nearest building footprint")]
struct Args {
    /// Street address to look up
    address: String,

    /// Search radius around the geocoded point, in meters
    #[arg(long, default_value_t = 50)]
    radius: u32,

    /// Material waste factor applied to the raw perimeter
    #[arg(long, default_value_t = 0.15)]
    waste_factor: f64,

    /// Restrict geocoding to a country (ISO 3166-1 alpha-2 code)
    #[arg(long, default_value = "ca")]
    country: String,

    /// EPSG code of the metric projection used for measurement
    #[arg(long, default_value_t = 3347)]
    metric_epsg: u32,

    /// Write the selected footprint as a GeoJSON feature to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn fail(message: &str) -> ! {
    eprintln!("ERROR: {message}");
    process::exit(1);
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let geocoder_config = GeocoderConfig {
        country_codes: Some(args.country.clone()),
        ..GeocoderConfig::default()
    };
    let geocoder = match NominatimGeocoder::new(geocoder_config) {
        Ok(geocoder) => geocoder,
        Err(err) => fail(&err.to_string()),
    };

    let point = match geocoder.geocode(&args.address) {
        Ok(point) => point,
        Err(FootprintError::GeocodeNotFound(_)) => fail("Could not geocode address"),
        Err(err) => fail(&err.to_string()),
    };
    log::info!(
        "geocoded \"{}\" to ({}, {})",
        args.address,
        point.latitude,
        point.longitude
    );

    let config = FootprintConfig {
        radius_m: args.radius,
        waste_factor: args.waste_factor,
        metric_epsg: args.metric_epsg,
        ..FootprintConfig::default()
    };
    let loader = match FootprintLoader::new(config) {
        Ok(loader) => loader,
        Err(err) => fail(&err.to_string()),
    };

    let building = match loader.query_building_footprint(point) {
        Ok(Some(building)) => building,
        Ok(None) => fail("No building found at this location"),
        Err(err) => fail(&err.to_string()),
    };

    let perimeter_m = (building.perimeter_m * 100.0).round() / 100.0;
    let recommended_m =
        (loader.config().recommended_length(perimeter_m) * 100.0).round() / 100.0;

    println!();
    println!("Perimeter: {perimeter_m} m");
    println!("Recommended: {recommended_m} m");

    if let Some(path) = &args.output {
        let result = render::footprint_feature(&building, &args.address, perimeter_m, recommended_m)
            .and_then(|feature| render::write_feature(path, &feature));
        match result {
            Ok(()) => println!("Wrote footprint to {}", path.display()),
            Err(err) => fail(&format!("{err:#}")),
        }
    }
}
