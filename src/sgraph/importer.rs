//! Reader for the line oriented scene description language.
//!
//! A scene file is a flat list of commands. Nodes are created and bound to
//! variables, then linked with `add-child`; one of them is chosen as the root
//! with `assign-root`:
//!
//! ```text
//! instance sphere models/sphere.obj
//! material red
//!     diffuse 1 0 0
//! end-material
//! leaf ball ball-leaf instanceof sphere
//! assign-material ball red
//! scale big big-scale 50 50 50
//! add-child ball big
//! group root scene
//! add-child big root
//! assign-root root
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

use cgmath::{Deg, Vector3};
use thiserror::Error;

use super::material::{Light, Material};
use super::mesh::{MeshError, MeshLoader, PolygonMesh};
use super::node::{GroupNode, LeafNode, SceneNode, TransformNode};
use super::scenegraph::Scenegraph;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unrecognized or out-of-place command: {0}")]
    UnknownCommand(String),
    #[error("parsed scene graph, but nothing set as root")]
    NoRoot,
    #[error("unexpected end of input in `{0}`")]
    UnexpectedEof(&'static str),
    #[error("`{command}` expected {expected}, found `{found}`")]
    UnexpectedToken {
        command: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("failed to read scene file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to import scene {path:?}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: Box<ParseError>,
    },
    #[error("node `{0}` is linked below itself")]
    Cycle(String),
    #[error("scene {0:?} is already being imported")]
    ImportCycle(PathBuf),
}

/// Builds a [`Scenegraph`] from scene description text.
pub struct ScenegraphImporter<'l> {
    loader: &'l dyn MeshLoader,
    base_dir: Option<PathBuf>,
    // Canonical paths of the files currently being parsed, outermost first
    import_chain: Vec<PathBuf>,
}

impl<'l> ScenegraphImporter<'l> {
    pub fn new(loader: &'l dyn MeshLoader) -> Self {
        Self {
            loader,
            base_dir: None,
            import_chain: Vec::new(),
        }
    }

    /// Directory used to resolve relative mesh, image and import paths
    /// that do not exist relative to the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn parse_file(&self, path: &Path) -> Result<Scenegraph, ParseError> {
        let input = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.import_chain.contains(&canonical) {
            return Err(ParseError::ImportCycle(path.to_path_buf()));
        }
        log::info!("Parsing scene {:?}", path);
        let mut import_chain = self.import_chain.clone();
        import_chain.push(canonical);
        let importer = ScenegraphImporter {
            loader: self.loader,
            base_dir: path.parent().map(Path::to_path_buf),
            import_chain,
        };
        importer.parse(&input)
    }

    pub fn parse(&self, input: &str) -> Result<Scenegraph, ParseError> {
        let clean = strip_comments(input);
        let mut tokens = Tokens::new(&clean);
        let mut state = ParseState::default();

        while let Some(command) = tokens.next() {
            log::debug!("scene command `{}`", command);
            match command {
                "instance" => self.parse_instance(&mut tokens, &mut state)?,
                "group" => parse_group(&mut tokens, &mut state)?,
                "leaf" => parse_leaf(&mut tokens, &mut state)?,
                "material" => parse_material(&mut tokens, &mut state)?,
                "scale" => parse_scale(&mut tokens, &mut state)?,
                "translate" => parse_translate(&mut tokens, &mut state)?,
                "rotate" => parse_rotate(&mut tokens, &mut state)?,
                "copy" => parse_copy(&mut tokens, &mut state)?,
                "import" => self.parse_import(&mut tokens, &mut state)?,
                "assign-material" => parse_assign_material(&mut tokens, &mut state)?,
                "add-child" => parse_add_child(&mut tokens, &mut state)?,
                "assign-root" => parse_set_root(&mut tokens, &mut state)?,
                "light" => parse_light(&mut tokens, &mut state)?,
                "assign-light" => parse_assign_light(&mut tokens, &mut state)?,
                "image" => self.parse_image(&mut tokens, &mut state)?,
                "assign-texture" => parse_assign_texture(&mut tokens, &mut state)?,
                other => return Err(ParseError::UnknownCommand(other.to_string())),
            }
        }

        let root_index = state.root.ok_or(ParseError::NoRoot)?;
        let root = state.build(root_index, &mut Vec::new())?;

        let mut scenegraph = Scenegraph::new(root);
        scenegraph.set_meshes(state.meshes);
        scenegraph.set_mesh_paths(state.mesh_paths);
        scenegraph.set_texture_paths(state.texture_paths);
        Ok(scenegraph)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let given = PathBuf::from(path);
        match &self.base_dir {
            Some(dir) if !given.exists() && given.is_relative() => {
                let candidate = dir.join(&given);
                if candidate.exists() {
                    candidate
                } else {
                    given
                }
            }
            _ => given,
        }
    }

    fn parse_instance(&self, tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
        let name = tokens.word("instance")?;
        let path = self.resolve(tokens.word("instance")?);
        let mut mesh = self.loader.load(&path)?;
        if mesh.primitive_count() == 0 {
            return Err(MeshError::Empty(path).into());
        }
        if mesh.vertices().iter().all(|v| v.normal == [0.0; 3]) {
            mesh.compute_normals();
        }
        log::info!(
            "Loaded mesh `{}` from {:?} ({} vertices, {} triangles)",
            name,
            path,
            mesh.vertex_count(),
            mesh.primitive_count()
        );
        state.meshes.insert(name.to_string(), mesh);
        state.mesh_paths.insert(name.to_string(), path);
        Ok(())
    }

    fn parse_import(&self, tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
        let var = tokens.word("import")?;
        let path = self.resolve(tokens.word("import")?);
        let imported = self
            .parse_file(&path)
            .map_err(|source| ParseError::Import {
                path: path.clone(),
                source: Box::new(source),
            })?;
        // Meshes and textures of the imported file stay behind
        let index = state.adopt(imported.into_root());
        state.bind(var, index);
        Ok(())
    }

    fn parse_image(&self, tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
        let name = tokens.word("image")?;
        let path = self.resolve(tokens.word("image")?);
        state.texture_paths.insert(name.to_string(), path);
        Ok(())
    }
}

/// Removes everything from `#` to the end of each line
pub fn strip_comments(input: &str) -> String {
    let mut clean = String::with_capacity(input.len());
    for line in input.lines() {
        let code = match line.find('#') {
            Some(at) => &line[..at],
            None => line,
        };
        clean.push_str(code);
        clean.push('\n');
    }
    clean
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    fn word(&mut self, command: &'static str) -> Result<&'a str, ParseError> {
        self.inner.next().ok_or(ParseError::UnexpectedEof(command))
    }

    fn float(&mut self, command: &'static str) -> Result<f32, ParseError> {
        let token = self.word(command)?;
        token.parse().map_err(|_| ParseError::UnexpectedToken {
            command,
            expected: "a number",
            found: token.to_string(),
        })
    }

    fn vec3(&mut self, command: &'static str) -> Result<Vector3<f32>, ParseError> {
        Ok(Vector3::new(
            self.float(command)?,
            self.float(command)?,
            self.float(command)?,
        ))
    }
}

/// A node bound to a variable while parsing. Children are kept as arena
/// indices so that edits made after `add-child` still reach the final tree.
struct Binding {
    node: SceneNode,
    children: Vec<usize>,
}

#[derive(Default)]
struct ParseState {
    arena: Vec<Binding>,
    nodes: HashMap<String, usize>,
    materials: HashMap<String, Material>,
    lights: HashMap<String, Light>,
    meshes: BTreeMap<String, PolygonMesh>,
    mesh_paths: BTreeMap<String, PathBuf>,
    texture_paths: BTreeMap<String, PathBuf>,
    root: Option<usize>,
}

impl ParseState {
    fn insert(&mut self, node: SceneNode) -> usize {
        self.arena.push(Binding {
            node,
            children: Vec::new(),
        });
        self.arena.len() - 1
    }

    fn bind(&mut self, var: &str, index: usize) {
        self.nodes.insert(var.to_string(), index);
    }

    fn lookup(&self, var: &str, command: &str) -> Option<usize> {
        let index = self.nodes.get(var).copied();
        if index.is_none() {
            log::warn!("{}: undefined variable `{}`, skipped", command, var);
        }
        index
    }

    /// Moves an already built subtree into the arena
    fn adopt(&mut self, mut node: SceneNode) -> usize {
        let children = node.take_children();
        let index = self.insert(node);
        for child in children {
            let child_index = self.adopt(child);
            self.arena[index].children.push(child_index);
        }
        index
    }

    /// Deep copies the arena subtree at `index`
    fn duplicate(&mut self, index: usize, visiting: &mut Vec<usize>) -> Result<usize, ParseError> {
        if visiting.contains(&index) {
            return Err(ParseError::Cycle(self.arena[index].node.name().to_string()));
        }
        visiting.push(index);
        let node = self.arena[index].node.clone();
        let copy = self.insert(node);
        for child in self.arena[index].children.clone() {
            let child_copy = self.duplicate(child, visiting)?;
            self.arena[copy].children.push(child_copy);
        }
        visiting.pop();
        Ok(copy)
    }

    /// Materializes the owned tree below `index`
    fn build(&self, index: usize, visiting: &mut Vec<usize>) -> Result<SceneNode, ParseError> {
        let binding = &self.arena[index];
        if visiting.contains(&index) {
            return Err(ParseError::Cycle(binding.node.name().to_string()));
        }
        visiting.push(index);
        let mut node = binding.node.clone();
        for &child in &binding.children {
            let child = self.build(child, visiting)?;
            if let Some(parent) = node.as_parent_mut() {
                parent.add_child(child);
            }
        }
        visiting.pop();
        Ok(node)
    }
}

fn parse_group(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("group")?;
    let name = tokens.word("group")?;
    let index = state.insert(GroupNode::new(name).into());
    state.bind(var, index);
    Ok(())
}

fn parse_leaf(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("leaf")?;
    let name = tokens.word("leaf")?;
    let keyword = tokens.word("leaf")?;
    if keyword != "instanceof" {
        return Err(ParseError::UnexpectedToken {
            command: "leaf",
            expected: "`instanceof`",
            found: keyword.to_string(),
        });
    }
    let instance_of = tokens.word("leaf")?;
    let index = state.insert(LeafNode::new(name, instance_of).into());
    state.bind(var, index);
    Ok(())
}

fn parse_scale(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("scale")?;
    let name = tokens.word("scale")?;
    let s = tokens.vec3("scale")?;
    let index = state.insert(TransformNode::scale(name, s.x, s.y, s.z).into());
    state.bind(var, index);
    Ok(())
}

fn parse_translate(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("translate")?;
    let name = tokens.word("translate")?;
    let t = tokens.vec3("translate")?;
    let index = state.insert(TransformNode::translate(name, t.x, t.y, t.z).into());
    state.bind(var, index);
    Ok(())
}

fn parse_rotate(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("rotate")?;
    let name = tokens.word("rotate")?;
    let degrees = tokens.float("rotate")?;
    let axis = tokens.vec3("rotate")?;
    let index = state.insert(TransformNode::rotate(name, Deg(degrees).into(), axis).into());
    state.bind(var, index);
    Ok(())
}

fn parse_material(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    const COMMAND: &str = "material";
    let name = tokens.word(COMMAND)?;
    let mut material = Material::default();
    loop {
        match tokens.word(COMMAND)? {
            "end-material" => break,
            "ambient" => material.ambient = tokens.vec3(COMMAND)?,
            "diffuse" => material.diffuse = tokens.vec3(COMMAND)?,
            "specular" => material.specular = tokens.vec3(COMMAND)?,
            "emission" => material.emission = tokens.vec3(COMMAND)?,
            "shininess" => material.shininess = tokens.float(COMMAND)?,
            "absorption" => material.absorption = tokens.float(COMMAND)?,
            "reflection" => material.reflection = tokens.float(COMMAND)?,
            "transparency" => material.transparency = tokens.float(COMMAND)?,
            "refractive-index" => material.refractive_index = tokens.float(COMMAND)?,
            other => log::warn!("material `{}`: ignoring `{}`", name, other),
        }
    }
    state.materials.insert(name.to_string(), material);
    Ok(())
}

fn parse_light(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    const COMMAND: &str = "light";
    let var = tokens.word(COMMAND)?;
    let mut light = Light::default();
    loop {
        match tokens.word(COMMAND)? {
            "end-light" => break,
            "ambient" => light.ambient = tokens.vec3(COMMAND)?,
            "diffuse" => light.diffuse = tokens.vec3(COMMAND)?,
            "specular" => light.specular = tokens.vec3(COMMAND)?,
            "position" => light.position = tokens.vec3(COMMAND)?.extend(1.0),
            "direction" => light.position = tokens.vec3(COMMAND)?.extend(0.0),
            "spot-direction" => light.spot_direction = tokens.vec3(COMMAND)?,
            "spot-angle" => light.spot_cutoff = tokens.float(COMMAND)?,
            other => log::warn!("light `{}`: ignoring `{}`", var, other),
        }
    }
    state.lights.insert(var.to_string(), light);
    Ok(())
}

fn parse_copy(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("copy")?;
    let source = tokens.word("copy")?;
    if let Some(index) = state.lookup(source, "copy") {
        let copy = state.duplicate(index, &mut Vec::new())?;
        state.bind(var, copy);
    }
    Ok(())
}

fn parse_assign_material(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("assign-material")?;
    let material_name = tokens.word("assign-material")?;
    let index = match state.lookup(var, "assign-material") {
        Some(index) => index,
        None => return Ok(()),
    };
    let material = match state.materials.get(material_name) {
        Some(material) => *material,
        None => {
            log::warn!("assign-material: undefined material `{}`, skipped", material_name);
            return Ok(());
        }
    };
    match state.arena[index].node.as_leaf_mut() {
        Some(leaf) => leaf.set_material(material),
        None => log::warn!("assign-material: `{}` is not a leaf, skipped", var),
    }
    Ok(())
}

fn parse_assign_texture(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("assign-texture")?;
    let texture = tokens.word("assign-texture")?;
    if let Some(index) = state.lookup(var, "assign-texture") {
        match state.arena[index].node.as_leaf_mut() {
            Some(leaf) => leaf.set_texture(texture),
            None => log::warn!("assign-texture: `{}` is not a leaf, skipped", var),
        }
    }
    Ok(())
}

fn parse_assign_light(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("assign-light")?;
    let light_name = tokens.word("assign-light")?;
    let index = match state.lookup(var, "assign-light") {
        Some(index) => index,
        None => return Ok(()),
    };
    let light = match state.lights.get(light_name) {
        Some(light) => *light,
        None => {
            log::warn!("assign-light: undefined light `{}`, skipped", light_name);
            return Ok(());
        }
    };
    match state.arena[index].node.as_parent_mut() {
        Some(parent) => parent.add_light(light),
        None => log::warn!("assign-light: `{}` cannot hold lights, skipped", var),
    }
    Ok(())
}

fn parse_add_child(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let child_var = tokens.word("add-child")?;
    let parent_var = tokens.word("add-child")?;
    let (child, parent) = match (
        state.lookup(child_var, "add-child"),
        state.lookup(parent_var, "add-child"),
    ) {
        (Some(child), Some(parent)) => (child, parent),
        _ => return Ok(()),
    };
    let binding = &mut state.arena[parent];
    match &binding.node {
        SceneNode::Leaf(_) => {
            log::warn!("add-child: `{}` is a leaf, skipped", parent_var);
            return Ok(());
        }
        SceneNode::Transform(t) if !binding.children.is_empty() => {
            log::warn!(
                "add-child: transform `{}` already has a child, `{}` will not be rendered",
                t.name(),
                child_var
            );
        }
        _ => {}
    }
    binding.children.push(child);
    Ok(())
}

fn parse_set_root(tokens: &mut Tokens, state: &mut ParseState) -> Result<(), ParseError> {
    let var = tokens.word("assign-root")?;
    state.root = state.lookup(var, "assign-root");
    Ok(())
}
