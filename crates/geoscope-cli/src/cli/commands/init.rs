use crate::cli::args::InitArgs;
use geoscope_core::config::write_sample_config;

pub fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    if args.config.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.config.display()
        );
    }
    write_sample_config(&args.config)?;
    eprintln!("wrote {}", args.config.display());
    Ok(())
}
