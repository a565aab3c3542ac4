use super::EliminationTree;
use std::io::Write;
use std::{fs::File, io, io::Read};

impl EliminationTree {
    /// Write the tree as JSON.
    pub fn write_to_file(&self, file: &mut File) -> Result<(), io::Error> {
        let json = serde_json::to_string(self)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Read a tree written by [`write_to_file`](EliminationTree::write_to_file).
    /// Trees that do not cover their elements are rejected.
    pub fn read_from_file(file: &mut File) -> Result<Self, io::Error> {
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        let tree: EliminationTree = serde_json::from_str(&buffer)?;
        tree.check_cover()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(tree)
    }
}

#[test]
fn test_json_io() {
    use crate::etree::*;
    use std::io::{Seek, SeekFrom};

    let graph = MeshGraph::from_edges(9, &[(0, 1, 1.0), (1, 2, 1.0), (4, 5, 2.0)]).unwrap();
    let settings = TreeSettingsBuilder::default()
        .strategy(TreeStrategyTag::HeavyEdgeMatching)
        .build()
        .unwrap();
    let tree = TreeBuilder::new(settings).unwrap().build(&graph).unwrap();

    let mut file = tempfile::tempfile().unwrap();
    tree.write_to_file(&mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let back = EliminationTree::read_from_file(&mut file).unwrap();
    assert_eq!(tree, back);
}
