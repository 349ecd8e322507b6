use ghsrc_controller::crd::GitHubSource;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = GitHubSource::crd();
    println!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
