// Embed git hash for `fakechat version`. Optional; no git = no hash.
fn main() {
    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            if let Ok(s) = String::from_utf8(output.stdout) {
                let hash = s.trim();
                if !hash.is_empty() {
                    println!("cargo:rustc-env=FAKECHAT_GIT_HASH={hash}");
                }
            }
        }
    }
}
