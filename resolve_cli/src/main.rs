mod fixture;

use crate::fixture::{FixtureDocument, FixtureProvider};
use anyhow::Context;
use resolve_core::{solve_for, Requirements};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct Opt {
    /// JSON fixture describing the root requirement and the implementation
    /// catalogue (see `resolve_cli::fixture::FixtureDocument`).
    #[structopt(name = "fixture .json file", parse(from_os_str))]
    input: PathBuf,

    /// Requested command name, overriding the fixture's `root.command`.
    #[structopt(long)]
    command: Option<String>,

    /// Assume `/lib/ld-linux.so.2` is present (enables multi-arch handling
    /// on Linux). Defaults to true; pass `--no-multi-arch` to disable.
    #[structopt(long)]
    no_multi_arch: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let contents = fs::read_to_string(&opt.input)
        .with_context(|| format!("reading fixture file {}", opt.input.display()))?;
    let doc: FixtureDocument = serde_json::from_str(&contents)
        .with_context(|| format!("parsing fixture file {}", opt.input.display()))?;

    let provider = FixtureProvider::from_document(&doc);
    let requirements = Requirements {
        iface: doc.root.iface.clone(),
        command: opt.command.clone().or_else(|| doc.root.command.clone()),
        os: None,
        cpu: None,
        source: false,
        extra_restrictions: BTreeMap::new(),
        languages: Vec::new(),
    };

    let result = solve_for(&requirements, &provider, !opt.no_multi_arch)
        .with_context(|| format!("solving for interface {}", requirements.iface))?;

    if !result.ok() {
        log::warn!(
            "no solution for interface {}; showing closest-match diagnostics instead",
            requirements.iface
        );
    }

    let xml = result
        .get_selections()
        .to_xml()
        .context("rendering selections document to XML")?;
    println!("{xml}");

    if !result.ok() {
        std::process::exit(1);
    }
    Ok(())
}
