use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use shelf_cluster_core::clustering::domain::partitioner::Algorithm;
use shelf_cluster_core::detection::domain::product_detector::{extract_crops, ProductDetector};
use shelf_cluster_core::detection::infrastructure::box_file_detector::BoxFileDetector;
use shelf_cluster_core::embedding::domain::embedding_source::EmbeddingSource;
use shelf_cluster_core::embedding::infrastructure::histogram_embedder::HistogramEmbedder;
use shelf_cluster_core::embedding::infrastructure::onnx_embedder::OnnxEmbedder;
use shelf_cluster_core::labels::domain::cluster_label_store::{ClusterLabel, ClusterLabelStore};
use shelf_cluster_core::labels::infrastructure::sqlite_label_store::SqliteLabelStore;
use shelf_cluster_core::photo::domain::photo_reader::PhotoReader;
use shelf_cluster_core::photo::infrastructure::image_file_reader::ImageFileReader;
use shelf_cluster_core::photo::infrastructure::image_file_writer::ImageFileWriter;
use shelf_cluster_core::pipeline::cluster_config::ClusterConfig;
use shelf_cluster_core::pipeline::cluster_crops_use_case::{ClusterCropsUseCase, GroupResult};
use shelf_cluster_core::pipeline::export_groups_use_case::ExportGroupsUseCase;
use shelf_cluster_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use shelf_cluster_core::shared::bounding_box::BoundingBox;
use shelf_cluster_core::shared::constants::{EMBEDDING_MODEL_NAME, PREVIEW_SIZE};
use shelf_cluster_core::shared::model_resolver::ModelResolver;

/// Group product crops from shelf photos and keep reviewer labels.
#[derive(Parser)]
#[command(name = "shelf-cluster", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Group the detected products of one shelf photo and print JSON.
    Cluster(ClusterArgs),

    /// Save labels given as CLUSTER_ID=LABEL pairs.
    Label {
        /// SQLite database holding labels.
        #[arg(long)]
        db: PathBuf,

        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Print all saved labels as JSON.
    Labels {
        #[arg(long)]
        db: PathBuf,
    },
}

#[derive(Args)]
struct ClusterArgs {
    /// Shelf photo (jpg, png, ...).
    image: PathBuf,

    /// JSON detections: an array of [x1, y1, x2, y2] boxes.
    #[arg(long)]
    boxes: PathBuf,

    /// Number of groups (default: config default_k, else floor(sqrt(n))).
    #[arg(long)]
    k: Option<usize>,

    /// Grouping algorithm: ward or kmeans.
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Seed for randomized algorithms.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = EmbedderKind::Histogram)]
    embedder: EmbedderKind,

    /// ONNX feature-extractor model (default: the model cache, downloading
    /// from the config's model_url when missing).
    #[arg(long)]
    model: Option<PathBuf>,

    /// JSON config file (default: user config dir, if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save member crops to <dir>/<cluster_id>/<n>.jpg.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Embedding worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Color histogram, no model needed.
    Histogram,
    /// ResNet-18 pooled features via ONNX Runtime.
    Onnx,
}

#[derive(Serialize)]
struct ClusterOutput {
    products: Vec<ProductOutput>,
    groups: Vec<GroupOutput>,
}

#[derive(Serialize)]
struct ProductOutput {
    cluster_id: String,
    /// Position of the box in the detections file.
    detection_index: usize,
    bbox: BoundingBox,
    representative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<PathBuf>,
}

#[derive(Serialize)]
struct GroupOutput {
    cluster_id: String,
    size: usize,
    /// Detection index of the representative crop.
    representative: usize,
    members: Vec<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Cluster(args) => run_cluster(args),
        Command::Label { db, assignments } => run_label(&db, assignments),
        Command::Labels { db } => run_labels(&db),
    }
}

fn run_cluster(args: ClusterArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate(&args)?;
    let config = resolve_config(&args)?;

    let photo = ImageFileReader::new().read(&args.image)?;
    let mut detector = BoxFileDetector::new(&args.boxes);
    let boxes = detector.detect(&photo)?;
    let (detection_indices, crops): (Vec<usize>, Vec<_>) =
        extract_crops(&photo, &boxes).into_iter().unzip();
    log::info!(
        "{} of {} detections produced crops ({}x{} photo)",
        crops.len(),
        boxes.len(),
        photo.width(),
        photo.height()
    );

    let embedder = build_embedder(args.embedder, args.model.as_deref(), &config)?;
    let mut use_case = ClusterCropsUseCase::new(
        embedder,
        config.build_engine(),
        Box::new(StdoutPipelineLogger::default()),
        None,
    )
    .with_executor(config.build_executor());
    let groups = use_case.execute(crops, args.k)?;

    let images = match &args.output_dir {
        Some(dir) => {
            let export = ExportGroupsUseCase::new(Box::new(ImageFileWriter::new()), Some(PREVIEW_SIZE));
            Some(export.execute(&groups, dir)?)
        }
        None => None,
    };

    let output = to_output(&groups, &detection_indices, images.as_ref());
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_label(db: &Path, assignments: Vec<(String, String)>) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteLabelStore::open(db)?;
    let labels: BTreeMap<String, String> = assignments.into_iter().collect();
    let saved = store.upsert_all(&labels)?;
    log::info!("Saved {} labels to {}", saved.len(), db.display());
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "status": "ok" }))?);
    Ok(())
}

fn run_labels(db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteLabelStore::open(db)?;
    let labels: Vec<ClusterLabel> = store.list()?;
    println!("{}", serde_json::to_string_pretty(&labels)?);
    Ok(())
}

fn validate(args: &ClusterArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.image.exists() {
        return Err(format!("Input image not found: {}", args.image.display()).into());
    }
    if !args.boxes.exists() {
        return Err(format!("Detections file not found: {}", args.boxes.display()).into());
    }
    if args.k == Some(0) {
        return Err("--k must be at least 1".into());
    }
    if args.threads == Some(0) {
        return Err("--threads must be at least 1".into());
    }
    if args.model.is_some() && args.embedder != EmbedderKind::Onnx {
        return Err("--model requires --embedder onnx".into());
    }
    Ok(())
}

/// Config file (explicit or default location), then command-line overrides.
fn resolve_config(args: &ClusterArgs) -> Result<ClusterConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ClusterConfig::load(path)?,
        None => ClusterConfig::load_or_default()?,
    };
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(threads) = args.threads {
        config.embedding_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn build_embedder(
    kind: EmbedderKind,
    model: Option<&Path>,
    config: &ClusterConfig,
) -> Result<Box<dyn EmbeddingSource>, Box<dyn std::error::Error>> {
    match kind {
        EmbedderKind::Histogram => Ok(Box::new(HistogramEmbedder::default())),
        EmbedderKind::Onnx => {
            log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
            let model_path = ModelResolver::new()?.resolve(
                EMBEDDING_MODEL_NAME,
                config.model_url.as_deref(),
                model,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            let embedder = OnnxEmbedder::new(&model_path, config.model_output.as_deref())?;
            Ok(Box::new(embedder.with_normalize(true)))
        }
    }
}

/// `detection_indices[i]` is the detections-file position of pipeline input `i`.
fn to_output(
    groups: &[GroupResult],
    detection_indices: &[usize],
    images: Option<&BTreeMap<usize, Vec<PathBuf>>>,
) -> ClusterOutput {
    let detection = |source_index: usize| detection_indices[source_index];
    let mut products = Vec::new();
    let mut summaries = Vec::with_capacity(groups.len());

    for group in groups {
        let cluster_id = group.group_id.to_string();
        let paths = images.and_then(|m| m.get(&group.group_id));
        for (n, member) in group.members.iter().enumerate() {
            products.push(ProductOutput {
                cluster_id: cluster_id.clone(),
                detection_index: detection(member.source_index),
                bbox: member.bounding_box,
                representative: n == group.representative_index,
                image: paths.and_then(|p| p.get(n)).cloned(),
            });
        }
        summaries.push(GroupOutput {
            cluster_id,
            size: group.members.len(),
            representative: detection(group.representative().source_index),
            members: group.members.iter().map(|m| detection(m.source_index)).collect(),
        });
    }

    ClusterOutput {
        products,
        groups: summaries,
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (id, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CLUSTER_ID=LABEL, got '{raw}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing cluster id in '{raw}'"));
    }
    Ok((id.to_string(), label.to_string()))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading embedding model... {pct}%");
    } else {
        eprint!("\rDownloading embedding model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use shelf_cluster_core::pipeline::cluster_crops_use_case::GroupMember;
    use shelf_cluster_core::shared::crop::Crop;
    use shelf_cluster_core::shared::frame::Frame;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shelf-cluster").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cluster_defaults() {
        let Command::Cluster(args) = parse(&["cluster", "shelf.jpg", "--boxes", "boxes.json"]).command
        else {
            panic!("expected cluster subcommand");
        };
        assert_eq!(args.image, PathBuf::from("shelf.jpg"));
        assert_eq!(args.k, None);
        assert_eq!(args.algorithm, None);
        assert_eq!(args.embedder, EmbedderKind::Histogram);
    }

    #[test]
    fn test_parse_cluster_options() {
        let Command::Cluster(args) = parse(&[
            "cluster",
            "shelf.jpg",
            "--boxes",
            "b.json",
            "--k",
            "4",
            "--algorithm",
            "kmeans",
            "--seed",
            "7",
            "--embedder",
            "onnx",
            "--threads",
            "3",
        ])
        .command
        else {
            panic!("expected cluster subcommand");
        };
        assert_eq!(args.k, Some(4));
        assert_eq!(args.algorithm, Some(Algorithm::Kmeans));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.embedder, EmbedderKind::Onnx);
        assert_eq!(args.threads, Some(3));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result = Cli::try_parse_from([
            "shelf-cluster",
            "cluster",
            "a.jpg",
            "--boxes",
            "b.json",
            "--algorithm",
            "dbscan",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_label_assignments() {
        let Command::Label { db, assignments } =
            parse(&["label", "--db", "labels.db", "0=Cola 330ml", "12=chips=salted"]).command
        else {
            panic!("expected label subcommand");
        };
        assert_eq!(db, PathBuf::from("labels.db"));
        assert_eq!(
            assignments,
            vec![
                ("0".to_string(), "Cola 330ml".to_string()),
                ("12".to_string(), "chips=salted".to_string())
            ]
        );
    }

    #[test]
    fn test_label_requires_assignment() {
        assert!(Cli::try_parse_from(["shelf-cluster", "label", "--db", "x.db"]).is_err());
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment(" =label").is_err());
        assert_eq!(parse_assignment("3=").unwrap(), ("3".to_string(), String::new()));
    }

    #[test]
    fn test_validate_rejects_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let boxes = dir.path().join("boxes.json");
        std::fs::write(&boxes, "[]").unwrap();
        let Command::Cluster(args) = parse(&[
            "cluster",
            dir.path().join("missing.jpg").to_str().unwrap(),
            "--boxes",
            boxes.to_str().unwrap(),
        ])
        .command
        else {
            panic!("expected cluster subcommand");
        };
        assert!(validate(&args).is_err());
    }

    #[test]
    fn test_resolve_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"algorithm": "ward", "seed": 1, "default_k": 3}"#).unwrap();
        let Command::Cluster(args) = parse(&[
            "cluster",
            "a.jpg",
            "--boxes",
            "b.json",
            "--config",
            config_path.to_str().unwrap(),
            "--algorithm",
            "kmeans",
            "--threads",
            "2",
        ])
        .command
        else {
            panic!("expected cluster subcommand");
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.algorithm, Algorithm::Kmeans);
        assert_eq!(config.seed, 1);
        assert_eq!(config.default_k, Some(3));
        assert_eq!(config.embedding_threads, 2);
    }

    fn member(source_index: usize, x: i32) -> GroupMember {
        let bounding_box = BoundingBox::new(x, 0, x + 1, 1).unwrap();
        GroupMember {
            source_index,
            crop: Crop::new(bounding_box, Frame::new(vec![0; 3], 1, 1, 3)),
            bounding_box,
            embedding: vec![0.0],
        }
    }

    #[test]
    fn test_output_lists_products_per_group() {
        let groups = vec![
            GroupResult {
                group_id: 0,
                representative_index: 1,
                members: vec![member(0, 0), member(2, 20)],
            },
            GroupResult {
                group_id: 1,
                representative_index: 0,
                members: vec![member(1, 10)],
            },
        ];
        let json = serde_json::to_value(to_output(&groups, &[0, 1, 2], None)).unwrap();

        assert_eq!(json["products"].as_array().unwrap().len(), 3);
        assert_eq!(json["products"][1]["cluster_id"], "0");
        assert_eq!(json["products"][1]["detection_index"], 2);
        assert_eq!(json["products"][1]["bbox"], serde_json::json!([20, 0, 21, 1]));
        assert_eq!(json["products"][1]["representative"], true);
        assert!(json["products"][0].get("image").is_none());

        assert_eq!(json["groups"][0]["representative"], 2);
        assert_eq!(json["groups"][0]["members"], serde_json::json!([0, 2]));
        assert_eq!(json["groups"][1]["size"], 1);
    }

    #[test]
    fn test_output_reports_detection_indices_after_skipped_boxes() {
        // Detections 0 and 2 fell outside the photo.
        let detection_indices = [1, 3, 4];
        let groups = vec![
            GroupResult {
                group_id: 0,
                representative_index: 0,
                members: vec![member(0, 0), member(2, 20)],
            },
            GroupResult {
                group_id: 1,
                representative_index: 0,
                members: vec![member(1, 10)],
            },
        ];
        let json = serde_json::to_value(to_output(&groups, &detection_indices, None)).unwrap();

        let reported: Vec<u64> = json["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["detection_index"].as_u64().unwrap())
            .collect();
        assert_eq!(reported, vec![1, 4, 3]);
        assert_eq!(json["groups"][0]["members"], serde_json::json!([1, 4]));
        assert_eq!(json["groups"][0]["representative"], 1);
        assert_eq!(json["groups"][1]["representative"], 3);
    }
}
