use gdal::raster::{Buffer, GdalDataType};
use gdal::{Dataset, DriverManager};
use raster_window_map::{
    ErrorKind, GdalBackend, Identity, MapOptions, RasterProcessor, Threshold, ThresholdKind,
};
use std::path::Path;
use tempfile::TempDir;

const WIDTH: usize = 10;
const HEIGHT: usize = 12;
const GEOTRANSFORM: [f64; 6] = [440720.0, 60.0, 0.0, 3751320.0, 0.0, -60.0];

fn write_f32_source(path: &Path, no_data: Option<f64>) -> Vec<f32> {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, WIDTH, HEIGHT, 2)
        .unwrap();
    dataset.set_geo_transform(&GEOTRANSFORM).unwrap();

    let values: Vec<f32> = (0..WIDTH * HEIGHT).map(|i| i as f32 * 0.5).collect();
    for band_index in 1..=2 {
        let mut band = dataset.rasterband(band_index).unwrap();
        band.set_no_data_value(no_data).unwrap();
        let mut buffer = Buffer::new((WIDTH, HEIGHT), values.clone());
        band.write((0, 0), (WIDTH, HEIGHT), &mut buffer).unwrap();
    }
    values
}

fn read_band(path: &Path, band_index: usize) -> Vec<f32> {
    let dataset = Dataset::open(path).unwrap();
    let band = dataset.rasterband(band_index).unwrap();
    band.read_as::<f32>((0, 0), (WIDTH, HEIGHT), (WIDTH, HEIGHT), None)
        .unwrap()
        .data()
        .to_vec()
}

#[test]
fn identity_round_trips_through_geotiff() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.tif");
    let dst = dir.path().join("dst.tif");
    let values = write_f32_source(&src, Some(-9999.0));

    let processor = RasterProcessor::new(GdalBackend);
    let options = MapOptions::default()
        .with_block_size(3, 3)
        .with_buffer_size(1);
    let summary = processor.map(&Identity, &src, &dst, &options).unwrap();
    assert_eq!(summary.bands, 2);
    assert_eq!(summary.tiles_written, 18);

    assert_eq!(read_band(&dst, 1), values);
    assert_eq!(read_band(&dst, 2), values);

    let dataset = Dataset::open(&dst).unwrap();
    assert_eq!(dataset.raster_size(), (WIDTH, HEIGHT));
    assert_eq!(dataset.geo_transform().unwrap(), GEOTRANSFORM);
    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.band_type(), GdalDataType::Float32);
    assert_eq!(band.no_data_value(), Some(-9999.0));
}

#[test]
fn byte_source_keeps_its_band_type() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("bytes.tif");
    let dst = dir.path().join("bytes_out.tif");

    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    {
        let mut dataset = driver
            .create_with_band_type::<u8, _>(&src, WIDTH, HEIGHT, 1)
            .unwrap();
        let mut band = dataset.rasterband(1).unwrap();
        let mut buffer = Buffer::new((WIDTH, HEIGHT), vec![1u8; WIDTH * HEIGHT]);
        band.write((0, 0), (WIDTH, HEIGHT), &mut buffer).unwrap();
    }

    let processor = RasterProcessor::new(GdalBackend);
    processor
        .map(
            &Identity,
            &src,
            &dst,
            &MapOptions::default().with_block_size(5, 5),
        )
        .unwrap();

    let dataset = Dataset::open(&dst).unwrap();
    assert_eq!(
        dataset.rasterband(1).unwrap().band_type(),
        GdalDataType::UInt8
    );
    assert!(read_band(&dst, 1).iter().all(|&v| v == 1.0));
}

#[test]
fn threshold_caps_geotiff_values() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.tif");
    let dst = dir.path().join("capped.tif");
    write_f32_source(&src, None);

    let processor = RasterProcessor::new(GdalBackend);
    processor
        .map(
            &Threshold::new(20.0, 0.0, ThresholdKind::Trunc),
            &src,
            &dst,
            &MapOptions::default().with_block_size(5, 5),
        )
        .unwrap();

    let max = read_band(&dst, 1).into_iter().fold(f32::MIN, f32::max);
    assert_eq!(max, 20.0);
}

#[test]
fn missing_source_reports_open_failure() {
    let dir = TempDir::new().unwrap();
    let processor = RasterProcessor::new(GdalBackend);
    let err = processor
        .map(
            &Identity,
            dir.path().join("missing.tif"),
            dir.path().join("out.tif"),
            &MapOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceOpenFailed);
}
