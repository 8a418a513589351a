//! TrapScale - camera trap image distance calibration
//!
//! This is the headless CLI entry point. It fetches a project's reference
//! image, reports any existing calibration, and optionally computes and
//! saves a new one from two image-space points and a real-world distance.
//!
//! Run with: cargo run --bin trapscale -- <project-id> <image-id> \
//!     [x1 y1 x2 y2 distance unit]

use std::env;

use anyhow::{bail, Context};

use trapscale::client::{ApiClient, CalibrationRecord, Session};
use trapscale::scale::{self, Unit};
use trapscale::selection::ReferencePoint;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 && args.len() != 9 {
        eprintln!(
            "Usage: {} <project-id> <image-id> [x1 y1 x2 y2 distance unit]",
            args[0]
        );
        eprintln!("  Coordinates are in native image pixels.");
        eprintln!("  Units: mm, cm, m, inch, ft");
        bail!("expected 2 or 8 arguments, got {}", args.len() - 1);
    }
    let project_id = args[1].clone();
    let image_id = args[2].clone();

    // Get configuration from environment or use defaults
    let base_url =
        env::var("TRAPSCALE_API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let session = match env::var("TRAPSCALE_API_TOKEN") {
        Ok(token) if !token.is_empty() => Session::with_token(token),
        _ => Session::anonymous(),
    };

    println!("TrapScale - Camera Trap Calibration");
    println!("====================================");
    println!("API: {}", base_url);
    println!("Project: {}", project_id);
    println!("Image: {}", image_id);
    println!("====================================\n");

    let client = ApiClient::new(base_url, session);

    // The image fetch also validates that the image decodes; its native
    // dimensions are what calibration coordinates are expressed in.
    let fetched = client
        .fetch_image(&image_id)
        .await
        .context("failed to fetch reference image")?;
    println!(
        "Image: {}x{} native pixels",
        fetched.meta.natural_width, fetched.meta.natural_height
    );

    match client.fetch_calibration(&project_id).await {
        Ok(Some(record)) => {
            println!("Existing calibration:");
            print_record(&record);
        }
        Ok(None) => println!("No existing calibration for this project."),
        Err(e) => eprintln!("Warning: calibration fetch failed: {}", e),
    }

    if args.len() == 9 {
        let x1: f64 = args[3].parse().context("x1 is not a number")?;
        let y1: f64 = args[4].parse().context("y1 is not a number")?;
        let x2: f64 = args[5].parse().context("x2 is not a number")?;
        let y2: f64 = args[6].parse().context("y2 is not a number")?;
        let distance: f64 = args[7].parse().context("distance is not a number")?;
        let unit = Unit::from_code(&args[8]);

        let points = vec![
            ReferencePoint::new(x1, y1),
            ReferencePoint::new(x2, y2),
        ];
        let measurement = scale::compute(&points, distance, unit)?;

        let record = CalibrationRecord {
            project_id: project_id.clone(),
            image_id,
            points,
            pixel_distance: measurement.pixel_distance,
            distance,
            unit,
            real_distance_per_pixel: measurement.scale_per_pixel,
        };

        println!("\nSaving calibration...");
        let canonical = client
            .save_calibration(&record)
            .await
            .context("failed to save calibration")?;
        println!("Saved. Server record:");
        print_record(&canonical);
    }

    Ok(())
}

fn print_record(record: &CalibrationRecord) {
    println!(
        "  1 pixel = {:.6} {}",
        record.real_distance_per_pixel, record.unit
    );
    println!(
        "  Reference: {} {} across {:.2} native pixels",
        record.distance, record.unit, record.pixel_distance
    );
    for (index, point) in record.points.iter().enumerate() {
        println!("  Point {}: ({:.2}, {:.2})", index + 1, point.x, point.y);
    }
}
