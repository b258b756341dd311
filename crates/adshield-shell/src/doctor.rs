//! Environment readiness check.

use adshield::RuleSet;
use anyhow::Result;

use crate::config::ShellConfig;
use crate::renderer::chromium::find_chromium;

/// Check Chromium availability, the profile directory and the rules file.
pub fn run(config: &ShellConfig) -> Result<bool> {
    println!("AdShield Doctor");
    println!("===============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set ADSHIELD_CHROMIUM_PATH."
        ),
    }

    let profile = &config.profile_dir;
    if profile.is_dir() {
        println!("[OK] Profile directory: {}", profile.display());
    } else {
        println!(
            "[..] Profile directory will be created: {}",
            profile.display()
        );
    }

    let rules_ok = match &config.rules_path {
        None => {
            let rules = RuleSet::builtin();
            println!(
                "[OK] Built-in rules: {} hostnames, {} selectors",
                rules.hostnames().len(),
                rules.dom_selectors().len()
            );
            true
        }
        Some(path) => match RuleSet::from_path(path) {
            Ok(rules) => {
                println!(
                    "[OK] Rules {}: {} hostnames, {} selectors",
                    path.display(),
                    rules.hostnames().len(),
                    rules.dom_selectors().len()
                );
                true
            }
            Err(e) => {
                println!("[!!] Rules {} rejected: {e}", path.display());
                false
            }
        },
    };

    println!();
    let ready = chromium.is_some() && rules_ok;
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(ready)
}
