use crate::{error::Result, panel::Panel};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

impl Panel {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.save_to(&mut file)?;
        file.flush()?;
        Ok(())
    }
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        Panel::load_from(&mut file)
    }
    pub fn save_to(&self, file: &mut impl Write) -> Result<()> {
        let bytes = self.to_bytes();
        log::debug!("writing {} panel bytes", bytes.len());
        file.write_all(&bytes)?;
        Ok(())
    }
    pub fn load_from(file: &mut impl Read) -> Result<Self> {
        let mut bytes = vec![];
        file.read_to_end(&mut bytes)?;
        Panel::from_bytes(&bytes)
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::{error::PanelError, panel::io::bytes::tests::get_mixed_panel};
    use tempfile::tempdir;

    #[test]
    fn test_fs_io() {
        let panel = get_mixed_panel();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("p0.tspanel");
        let mut file = File::create(&file_path).unwrap();
        panel.save_to(&mut file).unwrap();
        let mut file = File::open(&file_path).unwrap();
        let loaded = Panel::load_from(&mut file).unwrap();
        assert_eq!(loaded, panel);
        drop(file);
        let file_path = dir.path().join("p1.tspanel");
        panel.save(&file_path).unwrap();
        let loaded = Panel::load(&file_path).unwrap();
        assert_eq!(loaded, panel);
        assert!(matches!(
            Panel::load(dir.path().join("missing.tspanel")),
            Err(PanelError::Io(_))
        ));
        dir.close().unwrap();
    }
}
