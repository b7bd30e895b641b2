#![deny(warnings)]

mod options;

use anyhow::{Context, Result};
use clap::Parser;
use hillmap::config::{Config, API_KEY_VAR};
use hillmap::errors::ValidationError;
use hillmap::fetch::{ElevationFetcher, FetchRequest};
use hillmap::georeference::GeoreferenceRequest;
use hillmap::geotiff::WriteOptions;
use hillmap::inspect::{self, PlotOptions};
use hillmap::render::{render_with, RenderRequest};
use hillmap::scene::{BlenderHost, RenderParameters};
use hillmap::transform::{
    ClipRequest, ConvertRequest, DownsampleRequest, ReprojectRequest,
};
use options::{Cli, Command};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load().context("invalid configuration")?;
    let write_options = WriteOptions {
        sidecar: cli.sidecar || config.write_sidecar,
    };

    match cli.cmd {
        Command::Fetch {
            north,
            south,
            east,
            west,
            dataset,
            api_key,
            output,
        } => {
            let api_key = api_key
                .or_else(|| config.api_key.clone())
                .ok_or_else(|| {
                    ValidationError::MissingValue(API_KEY_VAR.to_string())
                })?;
            let request = FetchRequest::new(
                north,
                south,
                east,
                west,
                &api_key,
                dataset.id(),
                &output,
            )?;
            let path = ElevationFetcher::new(&config)?.fetch(&request)?;
            println!("{}", path.display());
        }
        Command::Describe { input } => {
            let description = inspect::describe(&input)?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Command::Plot {
            input,
            output,
            colormap,
            title,
            no_histogram,
        } => {
            let options = PlotOptions {
                histogram: !no_histogram,
                colormap,
                title,
                ..PlotOptions::new(&output)
            };
            let summary = inspect::plot(&input, &options)?;
            println!("{}", summary.map.display());
            if let Some((path, _)) = summary.histogram {
                println!("{}", path.display());
            }
        }
        Command::Reproject {
            input,
            target,
            output,
        } => {
            ReprojectRequest::new(&input, &target, &output)?
                .with_options(write_options)
                .run()?;
        }
        Command::Clip {
            input,
            geometry,
            output,
            no_crop,
        } => {
            ClipRequest::new(&input, &geometry, &output, !no_crop)?
                .with_options(write_options)
                .run()?;
        }
        Command::ToImage { input, output } => {
            ConvertRequest::new(&input, &output)?
                .with_options(write_options)
                .run()?;
        }
        Command::Downsample {
            input,
            output,
            factor,
        } => {
            DownsampleRequest::new(&input, &output, factor)?
                .with_options(write_options)
                .run()?;
        }
        Command::Render {
            dem_image,
            output,
            exaggeration,
            shadow_softness,
            sun_angle,
            resolution_scale,
            samples,
            blender,
        } => {
            let parameters = RenderParameters::new(
                exaggeration,
                shadow_softness,
                sun_angle,
                resolution_scale,
                samples,
            )?;
            let request = RenderRequest::new(&dem_image, &output, parameters)?;
            let host = BlenderHost::new(&blender.unwrap_or(config.blender))?;
            render_with(&host, &request)?;
        }
        Command::Georeference {
            rendered,
            reference,
            output,
        } => {
            GeoreferenceRequest::new(&rendered, &reference, &output)?
                .with_options(write_options)
                .run()?;
        }
    }

    Ok(())
}
