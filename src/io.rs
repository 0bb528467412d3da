use std::path::Path;

use anyhow::Result;
use tokio::{
    fs::{create_dir_all, File},
    io::{stdout, AsyncWriteExt},
};

async fn create_parent_dirs_for(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    Ok(())
}

pub async fn create_file<P>(name: P) -> Result<File>
where
    P: AsRef<Path>,
{
    create_parent_dirs_for(name.as_ref()).await?;
    let file = File::create(name).await?;
    Ok(file)
}

pub async fn save_file<P, B>(name: P, bytes: B) -> Result<()>
where
    P: AsRef<Path>,
    B: AsRef<[u8]>,
{
    let mut file = create_file(name).await?;
    file.write_all(bytes.as_ref()).await?;
    file.flush().await?;
    Ok(())
}

/// Write to `path` if given, otherwise to stdout.
pub async fn emit<P, B>(path: Option<P>, bytes: B) -> Result<()>
where
    P: AsRef<Path>,
    B: AsRef<[u8]>,
{
    match path {
        Some(path) => save_file(path, bytes).await,
        None => {
            let mut out = stdout();
            out.write_all(bytes.as_ref()).await?;
            out.flush().await?;
            Ok(())
        }
    }
}
