//! Write nowcast archives and observation files, then read them back
//! with zarrs directly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use archive::{
    store_observation, ArchiveError, ArchiveWriter, DataSource, EncodingSettings, NowcastProducts,
    RunMetadata, StoragePlan, ZarrImporter,
};
use chrono::Duration;
use ppn_common::{
    DerivationProtocol, FieldData, ForecastEnsemble, GridShape, PerturbedMotionSet, Unit,
};
use ppn_config::{Artifact, RequestedArtifacts, ScaleZero};
use test_utils::{
    assert_approx_eq, dbz_metadata, fmi_projection, nowcast_start, observation_times,
    rainrate_metadata, reflectivity_frames, scaled_values, scratch_dir, uniform_motion,
};
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs_filesystem::FilesystemStore;

const GRID: GridShape = GridShape {
    height: 4,
    width: 5,
};
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn forecast(members: usize, timesteps: usize, max: f32) -> ForecastEnsemble {
    let n = members * timesteps * GRID.len();
    let mut data = scaled_values(n, 0.0, max);
    data[7] = f32::NAN;
    ForecastEnsemble::new(data, members, timesteps, GRID, rainrate_metadata()).unwrap()
}

fn run_metadata() -> RunMetadata {
    let mut configuration = BTreeMap::new();
    configuration.insert("ENSEMBLE_SIZE".to_string(), "2".to_string());
    configuration.insert("DOMAIN".to_string(), "fmi".to_string());
    RunMetadata {
        started: nowcast_start() + Duration::minutes(3),
        ended: nowcast_start() + Duration::minutes(4),
        init_time: nowcast_start(),
        unit: Unit::MmPerHour,
        seed: Some(24),
        timestep: 5,
        time_format: TIME_FORMAT.to_string(),
        configuration,
        projection: Some(fmi_projection()),
    }
}

fn writer() -> ArchiveWriter {
    ArchiveWriter::new(EncodingSettings {
        scaler: 100.0,
        scale_zero: ScaleZero::Auto,
    })
}

fn open_store(path: &Path) -> Arc<FilesystemStore> {
    Arc::new(FilesystemStore::new(path).expect("Failed to open store"))
}

#[test]
fn test_write_forecasts_and_motion() {
    let dir = scratch_dir();
    let path = dir.path().join("nc_201908231200.zarr");

    let products = NowcastProducts {
        ensemble: Some(forecast(2, 3, 50.0)),
        deterministic: Some(forecast(1, 3, 20.0)),
        motion: Some(uniform_motion(GRID, 1.5, -0.5)),
        perturbed_motion: Some(PerturbedMotionSet {
            fields: vec![uniform_motion(GRID, 1.0, 0.0), uniform_motion(GRID, 2.0, 0.0)],
            seed: 24,
            protocol: DerivationProtocol::StepsV1,
        }),
        ..Default::default()
    };
    let requested = RequestedArtifacts::new(
        Artifact::ALL,
        [
            Artifact::Ensemble,
            Artifact::Deterministic,
            Artifact::Motion,
            Artifact::PerturbedMotion,
            Artifact::Unperturbed,
        ],
    );
    let plan = StoragePlan::new(&requested, &products).unwrap();
    assert!(!plan.includes(Artifact::Unperturbed));

    let summary = writer()
        .write(&path, &plan, &products, &run_metadata())
        .unwrap();
    // 2 members + 1 deterministic, 3 lead times each, plus 3 motion arrays
    assert_eq!(summary.arrays_written, 12);
    assert!(!dir.path().join("nc_201908231200.zarr.partial").exists());
    assert!(!path.join("unperturbed").exists());

    let store = open_store(&path);

    let array = Array::open(store.clone(), "/member-01/leadtime-02").unwrap();
    assert_eq!(array.shape(), &[4, 5]);
    let attrs = array.attributes();
    assert_eq!(attrs["Valid for"], "2019-08-23 12:15:00");
    assert_eq!(attrs["nodata"], 65535);
    let gain = attrs["gain"].as_f64().unwrap();
    let offset = attrs["offset"].as_f64().unwrap();
    assert_approx_eq!(gain, 0.01, 1e-12);
    assert_eq!(offset, 0.0);

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![4, 5]).unwrap();
    let stored: Vec<u16> = array.retrieve_array_subset_elements(&subset).unwrap();
    let original = products.ensemble.as_ref().unwrap().field(1, 2).unwrap();
    for (&q, &v) in stored.iter().zip(original) {
        assert_approx_eq!(q as f64 * gain + offset, v, gain / 2.0 + 1e-6);
    }

    // the NaN in the first field becomes nodata
    let first = Array::open(store.clone(), "/member-00/leadtime-00").unwrap();
    let stored: Vec<u16> = first.retrieve_array_subset_elements(&subset).unwrap();
    assert_eq!(stored[7], u16::MAX);
    assert_eq!(stored.iter().filter(|&&q| q == u16::MAX).count(), 1);

    assert!(Array::open(store.clone(), "/deterministic/leadtime-00").is_ok());

    let motion = Array::open(store.clone(), "/motion").unwrap();
    assert_eq!(motion.shape(), &[2, 4, 5]);
    let all = ArraySubset::new_with_start_shape(vec![0, 0, 0], vec![2, 4, 5]).unwrap();
    let uv: Vec<f32> = motion.retrieve_array_subset_elements(&all).unwrap();
    assert!(uv[..20].iter().all(|&u| u == 1.5));
    assert!(uv[20..].iter().all(|&v| v == -0.5));

    let member = Array::open(store.clone(), "/perturbed-motion/member-01").unwrap();
    let uv: Vec<f32> = member.retrieve_array_subset_elements(&all).unwrap();
    assert!(uv[..20].iter().all(|&u| u == 2.0));
}

#[test]
fn test_meta_groups() {
    let dir = scratch_dir();
    let path = dir.path().join("meta.zarr");
    let products = NowcastProducts {
        motion: Some(uniform_motion(GRID, 0.0, 0.0)),
        ..Default::default()
    };
    let requested = RequestedArtifacts::new([Artifact::Motion], [Artifact::Motion]);
    let plan = StoragePlan::new(&requested, &products).unwrap();
    writer()
        .write(&path, &plan, &products, &run_metadata())
        .unwrap();

    let store = open_store(&path);
    let meta = Group::open(store.clone(), "/meta").unwrap();
    let attrs = meta.attributes();
    assert_eq!(attrs["nowcast_started"], "2019-08-23 12:03:00");
    assert_eq!(attrs["nowcast_ended"], "2019-08-23 12:04:00");
    assert_eq!(attrs["nowcast_init_time"], "2019-08-23 12:00:00");
    assert_eq!(attrs["nowcast_units"], "mm/h");
    assert_eq!(attrs["nowcast_seed"], 24);

    let configuration = Group::open(store.clone(), "/meta/configuration").unwrap();
    assert_eq!(configuration.attributes()["ENSEMBLE_SIZE"], "2");
    assert_eq!(configuration.attributes()["DOMAIN"], "fmi");

    let projection = Group::open(store.clone(), "/meta/projection").unwrap();
    assert_eq!(projection.attributes()["yorigin"], "upper");
    assert_eq!(projection.attributes()["xpixelsize"], 1000.0);
}

#[test]
fn test_unknown_seed_is_labelled() {
    let dir = scratch_dir();
    let path = dir.path().join("noseed.zarr");
    let products = NowcastProducts {
        motion: Some(uniform_motion(GRID, 0.0, 0.0)),
        ..Default::default()
    };
    let requested = RequestedArtifacts::new([Artifact::Motion], [Artifact::Motion]);
    let plan = StoragePlan::new(&requested, &products).unwrap();
    let meta = RunMetadata {
        seed: None,
        ..run_metadata()
    };
    writer().write(&path, &plan, &products, &meta).unwrap();

    let meta = Group::open(open_store(&path), "/meta").unwrap();
    assert_eq!(meta.attributes()["nowcast_seed"], "Unknown");
}

#[test]
fn test_overflow_writes_nothing() {
    let dir = scratch_dir();
    let path = dir.path().join("overflow.zarr");
    // 700 mm/h * 100 exceeds the uint16 range
    let products = NowcastProducts {
        ensemble: Some(forecast(1, 2, 700.0)),
        motion: Some(uniform_motion(GRID, 0.0, 0.0)),
        ..Default::default()
    };
    let requested = RequestedArtifacts::new(Artifact::ALL, [Artifact::Ensemble]);
    let plan = StoragePlan::new(&requested, &products).unwrap();

    let err = writer()
        .write(&path, &plan, &products, &run_metadata())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Encoding { .. }));
    assert!(!path.exists());
    assert!(!dir.path().join("overflow.zarr.partial").exists());
}

#[test]
fn test_rewrite_replaces_archive() {
    let dir = scratch_dir();
    let path = dir.path().join("rewrite.zarr");
    let requested = RequestedArtifacts::new(Artifact::ALL, [Artifact::Ensemble]);

    let first = NowcastProducts {
        ensemble: Some(forecast(2, 1, 10.0)),
        ..Default::default()
    };
    let plan = StoragePlan::new(&requested, &first).unwrap();
    writer().write(&path, &plan, &first, &run_metadata()).unwrap();
    assert!(path.join("member-01").exists());

    let second = NowcastProducts {
        ensemble: Some(forecast(1, 1, 10.0)),
        ..Default::default()
    };
    writer()
        .write(&path, &plan, &second, &run_metadata())
        .unwrap();
    assert!(path.join("member-00").exists());
    assert!(!path.join("member-01").exists());
}

fn observation_source(root: &Path) -> DataSource {
    let yaml = format!(
        "root_path: {}\npath_fmt: \"%Y%m%d\"\nfn_pattern: \"%Y%m%d%H%M_radar\"\nfn_ext: zarr\ntimestep: 5\n",
        root.display()
    );
    serde_yaml::from_str(&yaml).unwrap()
}

#[test]
fn test_importer_reads_stored_observations() {
    let dir = scratch_dir();
    let source = observation_source(dir.path());
    let meta = dbz_metadata().with_projection(fmi_projection());
    let times = observation_times(nowcast_start(), 4, 5);
    let frames = reflectivity_frames(4, GRID);

    for (time, frame) in times.iter().zip(&frames) {
        let path = source.path_for(*time).unwrap();
        store_observation(&path, frame, GRID, &meta, *time).unwrap();
    }

    let importer = ZarrImporter::new(source);
    let files = importer.find_candidates(nowcast_start(), 3).unwrap();
    assert_eq!(files.len(), 4);
    assert_eq!(files[0].time, times[0]);

    let series = importer.read(&files).unwrap();
    assert_eq!(series.shape(), [4, 4, 5]);
    assert_eq!(series.timestamps(), &times[..]);
    assert_eq!(series.metadata(), &meta);
    assert_eq!(series.frame(3).unwrap(), &frames[3][..]);
}

#[test]
fn test_importer_rejects_mixed_metadata() {
    let dir = scratch_dir();
    let source = observation_source(dir.path());
    let times = observation_times(nowcast_start(), 2, 5);
    let frame = vec![0.0_f32; GRID.len()];

    store_observation(&source.path_for(times[0]).unwrap(), &frame, GRID, &dbz_metadata(), times[0])
        .unwrap();
    store_observation(
        &source.path_for(times[1]).unwrap(),
        &frame,
        GRID,
        &rainrate_metadata(),
        times[1],
    )
    .unwrap();

    let err = ZarrImporter::new(source)
        .load(nowcast_start(), 1)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidMetadata(_)));
}
