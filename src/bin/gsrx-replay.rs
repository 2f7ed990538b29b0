// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Surface cache trace replayer
//!
//! Replays a JSON trace of cache operations against a headless device and
//! prints the resulting cache statistics.

use clap::Parser;
use gsrx::core::cache::CacheConfig;
use gsrx::core::device::HeadlessDevice;
use gsrx::replay::{Replay, ReplaySummary, Trace};

#[derive(Debug, Parser)]
#[command(name = "gsrx-replay", version, about = "Replay a GS surface cache trace")]
struct Args {
    /// JSON trace to replay
    trace: String,

    /// Cache configuration (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Maximum number of device textures alive at once
    #[arg(long)]
    budget: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CacheConfig::load(path)?,
        None => CacheConfig::default(),
    };
    let device = match args.budget {
        Some(budget) => HeadlessDevice::with_budget(budget),
        None => HeadlessDevice::new(),
    };

    let trace = Trace::load(&args.trace)?;
    log::info!("Replaying {} operations from {}", trace.ops.len(), args.trace);

    let mut replay = Replay::new(device, config);
    let summary = replay.run(&trace)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ReplaySummary) {
    let stats = &summary.stats;
    println!("operations:      {} ({} skipped)", summary.ops, summary.skipped);
    println!(
        "cached:          {} render targets, {} depth-stencils, {} textures",
        summary.render_targets, summary.depth_stencils, summary.textures
    );
    for (name, lookups) in [
        ("render targets", &stats.render_targets),
        ("depth-stencils", &stats.depth_stencils),
        ("textures", &stats.textures),
    ] {
        println!(
            "{:<16} {} lookups, {} hits, {} misses",
            format!("{}:", name),
            lookups.lookups,
            lookups.hits,
            lookups.misses
        );
    }
    println!("views:           {}", stats.views);
    println!("alias hits:      {}", stats.alias_hits);
    println!("clean hits:      {}", stats.clean_hits);
    println!(
        "uploads:         {} ({} texels)",
        stats.uploads, stats.uploaded_texels
    );
    println!("dirty rects:     {}", stats.dirty_rects);
    println!("resolves:        {}", stats.resolves);
    println!("alloc failures:  {}", stats.allocation_failures);
    println!("evictions:       {}", stats.evictions.total());
}
