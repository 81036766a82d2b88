//! Multi-view render command
//!
//! Renders the canonical views of a glTF asset into `<save-path>/<view>.png`
//! and exits non-zero when the job fails or a required view is missing.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};

use remix_render::config::{Config, RenderConfig};
use remix_render::foundation::logging;
use remix_render::render::analysis;
use remix_render::render::multiview::{self, RenderJob};
use remix_render::render::views::ViewSet;

fn cli() -> Command {
    Command::new("remix_app")
        .about("Renders the canonical views of a glTF asset to PNG files")
        .arg(
            Arg::new("glb-path")
                .long("glb-path")
                .value_name("FILE")
                .help("Scene to render (.glb or .gltf)")
                .required_unless_present("analyze"),
        )
        .arg(
            Arg::new("save-path")
                .long("save-path")
                .value_name("DIR")
                .help("Directory receiving <view>.png")
                .required_unless_present("analyze"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Render settings (.toml or .ron)"),
        )
        .arg(
            Arg::new("views")
                .long("views")
                .value_name("NAMES")
                .help("Comma-separated subset of front,back,left,right,top,bottom")
                .default_value("front,back,left,right,top,bottom"),
        )
        .arg(
            Arg::new("require")
                .long("require")
                .value_name("NAMES")
                .help("Views that must exist afterwards (defaults to every requested view)"),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .value_name("FILE")
                .help("Print content statistics for an existing render and exit")
                .conflicts_with_all(["glb-path", "save-path"]),
        )
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_config(matches: &ArgMatches) -> Result<RenderConfig> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => RenderConfig::load_from_file(path).with_context(|| format!("Failed to load config {path}"))?,
        None => RenderConfig::default(),
    };
    config.validate().context("Invalid render configuration")?;
    Ok(config)
}

fn analyze(path: &str, background: [u8; 4]) -> Result<()> {
    let result = analysis::analyze_file(Path::new(path), background).with_context(|| format!("Failed to analyze {path}"))?;
    println!("{path}: {result}");
    if result.has_content() {
        Ok(())
    } else {
        anyhow::bail!("{path} contains no rendered content")
    }
}

fn main() -> Result<()> {
    logging::init_with_default(log::LevelFilter::Info);
    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    if let Some(path) = matches.get_one::<String>("analyze") {
        return analyze(path, config.background);
    }

    let scene_path = matches.get_one::<String>("glb-path").map(PathBuf::from).context("--glb-path is required")?;
    let save_path = matches.get_one::<String>("save-path").map(PathBuf::from).context("--save-path is required")?;

    let requested = matches.get_one::<String>("views").map_or_else(Vec::new, |list| split_names(list));
    let views = ViewSet::from_names(&requested).map_err(|name| anyhow::anyhow!("Unknown view '{name}'"))?;
    let required: Vec<String> = match matches.get_one::<String>("require") {
        Some(list) => split_names(list),
        None => views.names().into_iter().map(str::to_string).collect(),
    };

    let report = RenderJob::new(&scene_path, &save_path)
        .with_views(views)
        .with_config(config)
        .run()
        .with_context(|| format!("Rendering {} failed", scene_path.display()))?;

    for outcome in report.outcomes() {
        match &outcome.result {
            Ok(()) => println!("{:>8}: ok      {}", outcome.view_name, outcome.path.display()),
            Err(e) => println!("{:>8}: FAILED  {e}", outcome.view_name),
        }
    }

    let missing = multiview::missing_outputs(&save_path, &required);
    if !missing.is_empty() {
        anyhow::bail!("Missing required views in {}: {}", save_path.display(), missing.join(", "));
    }
    log::info!("Rendering complete: {} views in {}", report.succeeded().len(), save_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_split_names() {
        assert_eq!(split_names(" top, front ,,"), vec!["top", "front"]);
        assert!(split_names("").is_empty());
    }

    #[test]
    fn test_render_arguments() {
        let matches = cli()
            .try_get_matches_from(["remix_app", "--glb-path", "a.glb", "--save-path", "out", "--views", "top"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("views").unwrap(), "top");
        assert!(load_config(&matches).unwrap() == RenderConfig::default());
    }

    #[test]
    fn test_paths_required_without_analyze() {
        assert!(cli().try_get_matches_from(["remix_app", "--glb-path", "a.glb"]).is_err());
        assert!(cli().try_get_matches_from(["remix_app", "--analyze", "x.png"]).is_ok());
        assert!(cli()
            .try_get_matches_from(["remix_app", "--analyze", "x.png", "--glb-path", "a.glb"])
            .is_err());
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.toml");
        std::fs::write(&path, "width = 320\nheight = 240\n").unwrap();

        let matches = cli()
            .try_get_matches_from(["remix_app", "--analyze", "x.png", "--config", path.to_str().unwrap()])
            .unwrap();
        assert_eq!(load_config(&matches).unwrap().resolution(), (320, 240));
    }
}
