//! Route registration in `src/routes/index.js`

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{ExpmvcError, Result};
use crate::layout::pluralize;
use crate::patch::EXPORT_MARKER;

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyRegistered,
    /// The index file does not exist; nothing was written
    MissingIndex,
}

/// Mount `<entity>.routes` under `/<plural>` in the routes index.
///
/// The `require` line goes after the last existing `require(` line and the
/// `router.use` line after the last existing mount (never above the new
/// `require`), or right before `module.exports` when nothing is mounted yet.
pub fn register_route(index_path: &Path, entity: &str) -> Result<Registration> {
    if !index_path.exists() {
        warn!("Routes index not found at {}, skipping registration", index_path.display());
        return Ok(Registration::MissingIndex);
    }

    let text = fs::read_to_string(index_path)?;
    match add_route(&text, entity)? {
        Some(updated) => {
            fs::write(index_path, updated)?;
            info!("Registered /{} in {}", pluralize(&entity.to_lowercase()), index_path.display());
            Ok(Registration::Added)
        }
        None => Ok(Registration::AlreadyRegistered),
    }
}

/// Pure text transformation behind [`register_route`]; `None` when already present
pub fn add_route(text: &str, entity: &str) -> Result<Option<String>> {
    let name = entity.to_lowercase();
    let module = format!("./{}.routes", name);
    if text.contains(&format!("require('{}')", module))
        || text.contains(&format!("require(\"{}\")", module))
    {
        return Ok(None);
    }

    let import = format!("const {}Routes = require('{}');\n", name, module);
    let mount = format!("router.use('/{}', {}Routes);\n", pluralize(&name), name);

    let export_at = text.rfind(EXPORT_MARKER).ok_or_else(|| ExpmvcError::MarkerNotFound {
        marker: EXPORT_MARKER.to_string(),
    })?;

    // start of the line after the last require(...)
    let import_at = text[..export_at]
        .match_indices("require(")
        .last()
        .map(|(i, _)| line_end(text, i))
        .unwrap_or(0);

    // mounts stay grouped: after the last router.use(...) or else before the export
    let (mount_at, mount) = match text[..export_at].rfind("router.use(") {
        Some(i) => (line_end(text, i), mount),
        None => (export_at, format!("{}\n", mount)),
    };
    // a mount above the new require would reference the binding before it exists
    let mount_at = mount_at.max(import_at);

    let mut out = String::with_capacity(text.len() + import.len() + mount.len());
    out.push_str(&text[..import_at]);
    out.push_str(&import);
    out.push_str(&text[import_at..mount_at]);
    out.push_str(&mount);
    out.push_str(&text[mount_at..]);
    Ok(Some(out))
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..].find('\n').map(|nl| from + nl + 1).unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::project::ROUTES_INDEX;

    #[test]
    fn test_add_route_to_fresh_index() {
        let updated = add_route(ROUTES_INDEX, "Category").unwrap().unwrap();
        assert!(updated.contains(
            "const express = require('express');\nconst categoryRoutes = require('./category.routes');\n"
        ));
        assert!(updated.contains("router.use('/categories', categoryRoutes);\n\nmodule.exports = router;"));
    }

    #[test]
    fn test_add_route_is_idempotent() {
        let once = add_route(ROUTES_INDEX, "Post").unwrap().unwrap();
        assert!(add_route(&once, "Post").unwrap().is_none());

        let twice = add_route(&once, "User").unwrap().unwrap();
        let post_import = twice.find("require('./post.routes')").unwrap();
        let user_import = twice.find("require('./user.routes')").unwrap();
        assert!(post_import < user_import);
        assert!(twice.contains(
            "router.use('/posts', postRoutes);\nrouter.use('/users', userRoutes);\n\nmodule.exports"
        ));
    }

    #[test]
    fn test_add_route_require_after_last_mount() {
        let text = "const express = require('express');\nconst router = express.Router();\n\nrouter.use(express.json());\nconst home = require('./home');\nrouter.get('/', home);\n\nmodule.exports = router;\n";
        let updated = add_route(text, "Post").unwrap().unwrap();
        assert!(updated.contains(
            "const home = require('./home');\nconst postRoutes = require('./post.routes');\nrouter.use('/posts', postRoutes);\nrouter.get('/', home);\n"
        ));
        assert_eq!(updated.len(), text.len() + "const postRoutes = require('./post.routes');\nrouter.use('/posts', postRoutes);\n".len());
    }

    #[test]
    fn test_add_route_without_export() {
        assert!(matches!(
            add_route("const x = 1;\n", "Post"),
            Err(ExpmvcError::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_register_route_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let status = register_route(&dir.path().join("index.js"), "Post").unwrap();
        assert_eq!(status, Registration::MissingIndex);
    }
}
