use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use critterscope_core::blobs::domain::blob::Blob;
use critterscope_core::blobs::infrastructure::blob_classifier::BlobClassifier;
use critterscope_core::blobs::infrastructure::blob_detector::BlobDetector;
use critterscope_core::faces::domain::face::Face;
use critterscope_core::faces::domain::face_landmarks::FaceLandmarks;
use critterscope_core::faces::domain::species::Species;
use critterscope_core::faces::infrastructure::face_detector::FaceDetector;
use critterscope_core::features::infrastructure::extractor_factory::{
    create_extractor, ExtractorKind,
};
use critterscope_core::imaging::equalization::Equalization;
use critterscope_core::io::domain::image_reader::ImageReader;
use critterscope_core::io::domain::image_writer::ImageWriter;
use critterscope_core::io::infrastructure::image_file_reader::ImageFileReader;
use critterscope_core::io::infrastructure::image_file_writer::ImageFileWriter;
use critterscope_core::shared::constants::{IMAGE_EXTENSIONS, UNKNOWN_LABEL};
use critterscope_core::shared::frame::Frame;
use critterscope_core::shared::geometry::Rect;

/// Blob classification and human/cat face detection for still images.
#[derive(Parser)]
#[command(name = "critterscope")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment foreground blobs and label them against reference images.
    Blobs {
        /// Input image file.
        image: PathBuf,

        /// Labelled reference image, as LABEL=PATH (repeatable, LABEL > 0).
        #[arg(long = "reference", value_parser = parse_reference)]
        references: Vec<(u32, PathBuf)>,

        /// Working scale for detection (0.0-1.0].
        #[arg(long, default_value = "1.0")]
        resize: f64,

        /// Write the annotated image here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the foreground mask of the last detection here.
        #[arg(long)]
        mask: Option<PathBuf>,

        /// Local feature backend: orb or surf.
        #[arg(long, default_value = "orb")]
        extractor: ExtractorKind,
    },
    /// Detect human and cat faces with their landmarks.
    Faces {
        /// Input image file.
        image: PathBuf,

        /// Directory holding the OpenCV Haar cascade XML files.
        #[arg(long)]
        cascade_dir: PathBuf,

        /// Working scale for detection (0.0-1.0].
        #[arg(long, default_value = "1.0")]
        resize: f64,

        /// Use adaptive (CLAHE) instead of global histogram equalization.
        #[arg(long)]
        adaptive: bool,

        /// Write the annotated image here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Detect faces and blend them all into the largest one.
    Merge {
        /// Input image file.
        image: PathBuf,

        /// Directory holding the OpenCV Haar cascade XML files.
        #[arg(long)]
        cascade_dir: PathBuf,

        /// Write the merged face here.
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct BlobRecord {
    label: u32,
    bounds: Rect,
}

#[derive(Serialize)]
struct FaceRecord {
    species: Species,
    bounds: Rect,
    landmarks: FaceLandmarks,
}

#[derive(Serialize)]
struct MergeRecord {
    species: Species,
    width: u32,
    height: u32,
    landmarks: FaceLandmarks,
    merged: usize,
}

impl From<&Blob> for BlobRecord {
    fn from(blob: &Blob) -> Self {
        Self {
            label: blob.label(),
            bounds: blob.bounds(),
        }
    }
}

impl From<&Face> for FaceRecord {
    fn from(face: &Face) -> Self {
        Self {
            species: face.species(),
            bounds: face.bounds(),
            landmarks: *face.landmarks(),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    match cli.command {
        Command::Blobs {
            image,
            references,
            resize,
            output,
            mask,
            extractor,
        } => run_blobs(&image, &references, resize, output.as_deref(), mask.as_deref(), extractor),
        Command::Faces {
            image,
            cascade_dir,
            resize,
            adaptive,
            output,
        } => run_faces(&image, &cascade_dir, resize, adaptive, output.as_deref()),
        Command::Merge {
            image,
            cascade_dir,
            output,
        } => run_merge(&image, &cascade_dir, &output),
    }
}

fn run_blobs(
    input: &Path,
    references: &[(u32, PathBuf)],
    resize: f64,
    output: Option<&Path>,
    mask: Option<&Path>,
    extractor: ExtractorKind,
) -> Result<(), Box<dyn Error>> {
    let reader = ImageFileReader::new();
    let writer = ImageFileWriter::new();

    let mut classifier = BlobClassifier::with_extractor(create_extractor(extractor));
    for (label, path) in references {
        classifier.update(&Blob::new(reader.read(path)?, *label));
    }
    log::info!("Loaded {} reference blobs", classifier.reference_count());

    let mut frame = reader.read(input)?;
    let mut detector = BlobDetector::new();
    let mut blobs = detector.detect(&mut frame, resize, output.is_some())?;
    for blob in &mut blobs {
        classifier.classify(blob);
    }

    if let Some(path) = mask {
        writer.write(path, &Frame::from_gray(detector.mask().clone()))?;
        log::info!("Mask written to {}", path.display());
    }
    write_annotated(&writer, output, &frame)?;

    let records: Vec<BlobRecord> = blobs.iter().map(BlobRecord::from).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_faces(
    input: &Path,
    cascade_dir: &Path,
    resize: f64,
    adaptive: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let reader = ImageFileReader::new();
    let writer = ImageFileWriter::new();

    let equalization = if adaptive {
        Equalization::Adaptive
    } else {
        Equalization::Histogram
    };
    let mut detector = FaceDetector::from_cascade_dir(cascade_dir)?.with_equalization(equalization);

    let mut frame = reader.read(input)?;
    let faces = detector.detect(&mut frame, resize, output.is_some())?;
    write_annotated(&writer, output, &frame)?;

    let records: Vec<FaceRecord> = faces.iter().map(FaceRecord::from).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_merge(input: &Path, cascade_dir: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let reader = ImageFileReader::new();
    let writer = ImageFileWriter::new();

    let mut detector = FaceDetector::from_cascade_dir(cascade_dir)?;
    let mut frame = reader.read(input)?;
    let faces = detector.detect(&mut frame, 1.0, false)?;

    let merged = merge_all(&faces)?.ok_or("No faces found to merge")?;
    writer.write(output, merged.frame())?;
    log::info!("Merged {} faces into {}", faces.len(), output.display());

    let record = MergeRecord {
        species: merged.species(),
        width: merged.width(),
        height: merged.height(),
        landmarks: *merged.landmarks(),
        merged: faces.len(),
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Folds every face into the running merge, left to right.
fn merge_all(faces: &[Face]) -> Result<Option<Face>, Box<dyn Error>> {
    let mut iter = faces.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut merged = first.clone();
    for face in iter {
        merged = Face::merge(&merged, face)?;
    }
    Ok(Some(merged))
}

fn write_annotated(
    writer: &dyn ImageWriter,
    output: Option<&Path>,
    frame: &Frame,
) -> Result<(), Box<dyn Error>> {
    if let Some(path) = output {
        writer.write(path, frame)?;
        log::info!("Output written to {}", path.display());
    }
    Ok(())
}

fn parse_reference(s: &str) -> Result<(u32, PathBuf), String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("Reference must be LABEL=PATH, got '{s}'"))?;
    let label: u32 = label
        .trim()
        .parse()
        .map_err(|_| format!("Reference label must be a non-negative integer, got '{label}'"))?;
    if path.is_empty() {
        return Err(format!("Reference path is empty in '{s}'"));
    }
    Ok((label, PathBuf::from(path)))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Blobs {
            image,
            references,
            resize,
            output,
            mask,
            ..
        } => {
            validate_input(image)?;
            validate_resize(*resize)?;
            for (label, path) in references {
                if *label == UNKNOWN_LABEL {
                    return Err(format!(
                        "Reference label {UNKNOWN_LABEL} is reserved for unknown blobs"
                    )
                    .into());
                }
                validate_input(path)?;
            }
            validate_output(output.as_deref())?;
            validate_output(mask.as_deref())?;
        }
        Command::Faces {
            image,
            cascade_dir,
            resize,
            output,
            ..
        } => {
            validate_input(image)?;
            validate_cascade_dir(cascade_dir)?;
            validate_resize(*resize)?;
            validate_output(output.as_deref())?;
        }
        Command::Merge {
            image,
            cascade_dir,
            output,
        } => {
            validate_input(image)?;
            validate_cascade_dir(cascade_dir)?;
            validate_output(Some(output.as_path()))?;
        }
    }
    Ok(())
}

fn validate_input(path: &Path) -> Result<(), Box<dyn Error>> {
    if !path.exists() {
        return Err(format!("Input file not found: {}", path.display()).into());
    }
    if !is_image(path) {
        return Err(format!("Not a supported image file: {}", path.display()).into());
    }
    Ok(())
}

fn validate_output(path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match path {
        Some(p) if !is_image(p) => {
            Err(format!("Output must have an image extension, got {}", p.display()).into())
        }
        _ => Ok(()),
    }
}

fn validate_resize(resize: f64) -> Result<(), Box<dyn Error>> {
    if !(resize > 0.0 && resize <= 1.0) {
        return Err(format!("Resize factor must be in (0.0, 1.0], got {resize}").into());
    }
    Ok(())
}

fn validate_cascade_dir(dir: &Path) -> Result<(), Box<dyn Error>> {
    if !dir.is_dir() {
        return Err(format!("Cascade directory not found: {}", dir.display()).into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("critterscope").chain(args.iter().copied())).unwrap()
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    // ── parse_reference ─────────────────────────────────────────────

    #[test]
    fn test_parse_reference() {
        let (label, path) = parse_reference("3=refs/bean.png").unwrap();
        assert_eq!(label, 3);
        assert_eq!(path, PathBuf::from("refs/bean.png"));
    }

    #[test]
    fn test_parse_reference_rejects_malformed() {
        assert!(parse_reference("bean.png").is_err());
        assert!(parse_reference("x=bean.png").is_err());
        assert!(parse_reference("-1=bean.png").is_err());
        assert!(parse_reference("2=").is_err());
    }

    // ── argument parsing ────────────────────────────────────────────

    #[test]
    fn test_blobs_defaults() {
        let cli = parse(&["blobs", "in.png"]);
        match cli.command {
            Command::Blobs {
                resize,
                extractor,
                references,
                ..
            } => {
                assert_eq!(resize, 1.0);
                assert_eq!(extractor, ExtractorKind::Orb);
                assert!(references.is_empty());
            }
            _ => panic!("expected blobs"),
        }
    }

    #[test]
    fn test_blobs_repeated_references() {
        let cli = parse(&[
            "blobs", "in.png", "--reference", "1=a.png", "--reference", "2=b.png", "--extractor", "surf",
        ]);
        match cli.command {
            Command::Blobs {
                references,
                extractor,
                ..
            } => {
                assert_eq!(references.len(), 2);
                assert_eq!(references[1].0, 2);
                assert_eq!(extractor, ExtractorKind::Surf);
            }
            _ => panic!("expected blobs"),
        }
    }

    #[test]
    fn test_merge_requires_output() {
        let args = ["critterscope", "merge", "in.png", "--cascade-dir", "cascades"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    // ── validate ────────────────────────────────────────────────────

    #[test]
    fn test_validate_missing_input() {
        let cli = parse(&["blobs", "/nonexistent/in.png"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_blobs_ok() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "in.png");
        let reference = touch(dir.path(), "ref.jpg");
        let cli = parse(&[
            "blobs",
            input.to_str().unwrap(),
            "--reference",
            &format!("4={}", reference.display()),
            "--resize",
            "0.5",
        ]);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_label() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "in.png");
        let reference = touch(dir.path(), "ref.png");
        let cli = parse(&[
            "blobs",
            input.to_str().unwrap(),
            "--reference",
            &format!("0={}", reference.display()),
        ]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_rejects_resize_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "in.png");
        for resize in ["0", "1.5", "NaN"] {
            let cli = parse(&["blobs", input.to_str().unwrap(), "--resize", resize]);
            assert!(validate(&cli).is_err(), "resize {resize} accepted");
        }
    }

    #[test]
    fn test_validate_faces_needs_cascade_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "in.png");
        let missing = dir.path().join("cascades");
        let cli = parse(&[
            "faces",
            input.to_str().unwrap(),
            "--cascade-dir",
            missing.to_str().unwrap(),
        ]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_merge_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "in.png");
        let cli = parse(&[
            "merge",
            input.to_str().unwrap(),
            "--cascade-dir",
            dir.path().to_str().unwrap(),
            "--output",
            "merged.txt",
        ]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_is_image_case_insensitive() {
        assert!(is_image(Path::new("a.PNG")));
        assert!(!is_image(Path::new("a.mp4")));
        assert!(!is_image(Path::new("noext")));
    }

    // ── merge_all ───────────────────────────────────────────────────

    #[test]
    fn test_merge_all_empty_is_none() {
        assert!(merge_all(&[]).unwrap().is_none());
    }

    #[test]
    fn test_merge_all_single_face_unchanged() {
        let face = Face::new(
            Species::Cat,
            Frame::blank(10, 10, 3),
            FaceLandmarks::cat(10.0, 10.0),
            Rect::new(0, 0, 10, 10),
        );
        let merged = merge_all(std::slice::from_ref(&face)).unwrap().unwrap();
        assert_eq!(merged, face);
    }
}
