use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tryon_core::{
    apply_mask, AccessoryCategory, AccessoryLibrary, AccessoryRef, AccessoryResolver,
    FitterConfig, LandmarkSet, RasterImage, TryOnItem, VirtualFitter,
};

#[derive(Parser)]
#[command(name = "tryon", about = "Place accessories on an avatar using detected landmarks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply accessories to an avatar image, in the order given
    Apply {
        /// Avatar image (PNG, JPEG, ...)
        #[arg(short, long)]
        avatar: PathBuf,
        /// Landmarks JSON produced by the perception step
        #[arg(short, long)]
        landmarks: Option<PathBuf>,
        /// CATEGORY=PATH for a file, or CATEGORY:ID for a library accessory
        #[arg(short = 'x', long = "accessory", required = true)]
        accessories: Vec<String>,
        /// Where to write the composited PNG
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the placement a category would get, as JSON
    Place {
        #[arg(short, long)]
        category: String,
        #[arg(short, long)]
        landmarks: Option<PathBuf>,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Cut a person out of an image using a segmentation mask
    Mask {
        #[arg(short, long)]
        image: PathBuf,
        /// Mask image; any non-black pixel is foreground
        #[arg(short, long)]
        mask: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List accessories in the library
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = FitterConfig::from_env();
    let library = AccessoryLibrary::from_config(&config);

    match cli.command {
        Commands::Apply { avatar, landmarks, accessories, output } => {
            let items = accessories
                .iter()
                .map(|spec| parse_item(spec, &library))
                .collect::<Result<Vec<_>>>()?;
            let landmarks = landmarks.as_deref().map(load_landmarks).transpose()?;
            let avatar = load_raster(&avatar)?;

            let fitter = VirtualFitter::from_config(Arc::new(AccessoryResolver::new()), &config);
            let result = fitter.apply_all(avatar, &items, landmarks.as_ref());

            result
                .into_rgba()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} ({} accessories)", output.display(), items.len());
        }
        Commands::Place { category, landmarks, width, height } => {
            let landmarks = landmarks.as_deref().map(load_landmarks).transpose()?;
            let fitter = VirtualFitter::from_config(Arc::new(AccessoryResolver::new()), &config);
            let placement = fitter.placement_for(
                AccessoryCategory::parse(&category),
                landmarks.as_ref(),
                width,
                height,
            );
            println!("{}", serde_json::to_string_pretty(&placement)?);
        }
        Commands::Mask { image, mask, output } => {
            let source = load_raster(&image)?;
            let mask = load_mask(&mask)?;
            let cutout = apply_mask(&source, &mask)?;
            cutout
                .into_rgba()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
        Commands::List { category } => {
            let listed = match category {
                Some(name) => library.list(AccessoryCategory::parse(&name))?,
                None => library.list_all()?,
            };
            if listed.is_empty() {
                println!("No accessories in {}", library.root().display());
            }
            for d in listed {
                let category = d.category.as_str();
                match d.path.as_deref() {
                    Some(p) => println!("{category:<10} {:<24} {}", d.id, p.display()),
                    None => println!("{category:<10} {}", d.id),
                }
            }
        }
    }

    Ok(())
}

/// `clothing=art/shirt.png` → file reference; `hats:fedora` → library reference.
fn parse_item(spec: &str, library: &AccessoryLibrary) -> Result<TryOnItem> {
    if let Some((category, path)) = spec.split_once('=') {
        return Ok(TryOnItem::new(
            AccessoryRef::Path(PathBuf::from(path)),
            AccessoryCategory::parse(category),
        ));
    }
    if let Some((category, id)) = spec.split_once(':') {
        let category = AccessoryCategory::parse(category);
        return Ok(TryOnItem::new(library.reference(category, id), category));
    }
    bail!("accessory `{spec}` must be CATEGORY=PATH or CATEGORY:ID")
}

fn load_raster(path: &Path) -> Result<RasterImage> {
    let image = image::open(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(RasterImage::from(image))
}

fn load_landmarks(path: &Path) -> Result<LandmarkSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing landmarks in {}", path.display()))
}

fn load_mask(path: &Path) -> Result<Array2<bool>> {
    let luma = image::open(path)
        .with_context(|| format!("reading {}", path.display()))?
        .into_luma8();
    let (w, h) = luma.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        luma.get_pixel(col as u32, row as u32).0[0] > 0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_path() {
        let lib = AccessoryLibrary::new("/art", "png");
        let item = parse_item("glasses=/tmp/round.png", &lib).unwrap();
        assert_eq!(item.category, AccessoryCategory::Glasses);
        assert!(matches!(item.accessory, AccessoryRef::Path(ref p) if p == Path::new("/tmp/round.png")));
    }

    #[test]
    fn test_parse_item_library_id() {
        let lib = AccessoryLibrary::new("/art", "png");
        let item = parse_item("hats:fedora", &lib).unwrap();
        assert_eq!(item.category, AccessoryCategory::Hats);
        match item.accessory {
            AccessoryRef::Descriptor(d) => {
                assert_eq!(d.path, Some(PathBuf::from("/art/hats/fedora.png")));
            }
            other => panic!("expected descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_item_unknown_category_is_other() {
        let lib = AccessoryLibrary::new("/art", "png");
        let item = parse_item("scarf=/tmp/s.png", &lib).unwrap();
        assert_eq!(item.category, AccessoryCategory::Other);
    }

    #[test]
    fn test_parse_item_rejects_bare_name() {
        let lib = AccessoryLibrary::new("/art", "png");
        assert!(parse_item("fedora", &lib).is_err());
    }
}
