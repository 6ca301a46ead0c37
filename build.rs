// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Repeatable `--source`
fn source_arg() -> Arg {
    Arg::new("source")
        .short('s')
        .long("source")
        .value_name("SOURCE")
        .action(ArgAction::Append)
        .help("Package source (URL or directory), consulted before configured sources")
}

fn config_file_arg() -> Arg {
    Arg::new("config_file")
        .long("config-file")
        .value_name("FILE")
        .help("Settings file to use instead of the nupack.toml lookup")
}

fn save_mode_arg() -> Arg {
    Arg::new("save_mode")
        .long("save-mode")
        .value_name("MODE")
        .help("Artifacts kept per package: any of nuspec;nupkg;files")
}

fn build_cli() -> Command {
    Command::new("nupack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Nupack Contributors")
        .about("Restore and install packages for a solution")
        .subcommand_required(true)
        .subcommand(
            Command::new("restore")
                .about("Restore the packages declared by a solution or a packages.config file")
                .arg(Arg::new("path").help("Solution file, directory holding one solution, or packages.config"))
                .arg(Arg::new("packages_directory").long("packages-directory").help("Folder packages are installed into"))
                .arg(Arg::new("solution_directory").long("solution-directory").help("Solution directory"))
                .arg(save_mode_arg())
                .arg(source_arg())
                .arg(config_file_arg()),
        )
        .subcommand(
            Command::new("install")
                .about("Install a package and its dependencies")
                .arg(Arg::new("id").required(true).help("Package id"))
                .arg(Arg::new("version").long("version").help("Exact version to install"))
                .arg(
                    Arg::new("prerelease")
                        .long("prerelease")
                        .action(ArgAction::SetTrue)
                        .help("Allow prerelease versions"),
                )
                .arg(
                    Arg::new("include_unlisted")
                        .long("include-unlisted")
                        .action(ArgAction::SetTrue)
                        .help("Allow versions hidden from the feed listing"),
                )
                .arg(
                    Arg::new("dependency_version")
                        .long("dependency-version")
                        .help("lowest, highest, highestminor, highestpatch or ignore"),
                )
                .arg(Arg::new("output_directory").short('o').long("output-directory").help("Folder packages are installed into"))
                .arg(save_mode_arg())
                .arg(source_arg())
                .arg(config_file_arg()),
        )
        .subcommand(
            Command::new("update")
                .about("Update nupack itself")
                .arg(
                    Arg::new("self")
                        .long("self")
                        .required(true)
                        .action(ArgAction::SetTrue)
                        .help("Replace the running executable with the latest release"),
                )
                .arg(source_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("nupack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
