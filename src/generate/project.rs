//! New project skeleton

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ExpmvcError, Result};
use crate::layout::{ProjectLayout, MANIFEST_FILE};

/// Directories created for every new project
pub const PROJECT_DIRS: &[&str] = &[
    "src/controllers",
    "src/models",
    "src/routes",
    "src/services",
    "src/helpers",
    "src/middlewares",
    "src/validations",
    "src/utils",
    "src/jobs",
    "src/views",
    "src/views/layouts",
    "src/assets/css",
    "src/assets/js",
    "src/assets/images",
    "src/assets/uploads",
    "config",
];

/// Runtime dependencies declared in a fresh package.json
pub const BASE_DEPENDENCIES: &[(&str, &str)] = &[
    ("express", "^4.18.2"),
    ("dotenv", "^16.3.1"),
    ("morgan", "^1.10.0"),
    ("ejs", "^3.1.9"),
    ("express-ejs-layouts", "^2.5.1"),
    ("mongoose", "^8.0.0"),
    ("joi", "^17.11.0"),
    ("method-override", "^3.0.0"),
];

pub const BASE_DEV_DEPENDENCIES: &[(&str, &str)] = &[("nodemon", "^3.0.1")];

const SERVER: &str = r#"require('dotenv').config();
const app = require('./config/app');
const connectDB = require('./config/database');

connectDB();

const PORT = process.env.PORT || 5000;
app.listen(PORT, () => console.log('Server running on port', PORT));
"#;

const APP: &str = r#"const express = require('express');
const morgan = require('morgan');
const methodOverride = require('method-override');
const expressLayouts = require('express-ejs-layouts');
const path = require('path');
const routes = require('../src/routes/index');

const app = express();

app.use(methodOverride('_method'));
app.use(express.json());
app.use(express.urlencoded({ extended: true }));
app.use(morgan('dev'));

app.set('views', path.join(__dirname, '../src/views'));
app.set('view engine', 'ejs');
app.use(expressLayouts);
app.set('layout', 'layouts/application');

app.use('/', routes);

module.exports = app;
"#;

const DATABASE: &str = r#"const mongoose = require('mongoose');

module.exports = async function connectDB() {
    try {
        await mongoose.connect(process.env.MONGODB_URI);
        console.log('MongoDB connected');
    } catch (error) {
        console.error('MongoDB connection failed:', error.message);
        process.exit(1);
    }
};
"#;

pub const ROUTES_INDEX: &str = r#"const express = require('express');
const router = express.Router();

router.get('/', (req, res) => {
    res.send('API is working!');
});

module.exports = router;
"#;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title><%= typeof title !== 'undefined' ? title : 'expmvc' %></title>
</head>
<body>
    <%- body %>
</body>
</html>
"#;

const GITIGNORE: &str = r#"node_modules
.env
.env.local
*.log
npm-debug.log*
.DS_Store
Thumbs.db
.vscode/
.idea/
*.swp
*.swo
"#;

const ENV: &str = r#"PORT=3000
MONGODB_URI=mongodb://localhost:27017/yourdb
NODE_ENV=development
"#;

fn readme(name: &str) -> String {
    format!(
        "# {name}\n\nGenerated with **expmvc**.\n\n```\ncd {name}\nnpm install\nnpm run dev\n```\n"
    )
}

/// package.json for a fresh project, keys in conventional order
pub fn manifest(name: &str) -> Value {
    let deps: serde_json::Map<String, Value> = BASE_DEPENDENCIES
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    let dev: serde_json::Map<String, Value> = BASE_DEV_DEPENDENCIES
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();

    json!({
        "name": name,
        "version": "1.0.0",
        "main": "server.js",
        "scripts": {
            "start": "node server.js",
            "dev": "nodemon server.js"
        },
        "dependencies": deps,
        "devDependencies": dev
    })
}

/// Create `<parent>/<name>` with the standard tree and starter files.
///
/// Fails with [`ExpmvcError::AlreadyExists`] if the target exists and is not
/// an empty directory. Packages are not installed here.
pub fn create_project(parent: &Path, name: &str) -> Result<ProjectLayout> {
    let root = parent.join(name);
    if root.exists() && fs::read_dir(&root)?.next().is_some() {
        return Err(ExpmvcError::AlreadyExists(root));
    }

    info!("Creating project '{}' in {}", name, root.display());
    for dir in PROJECT_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)?;
        debug!("Created {}", path.display());
    }

    let files: Vec<(PathBuf, String)> = vec![
        (root.join("server.js"), SERVER.to_string()),
        (root.join("config/app.js"), APP.to_string()),
        (root.join("config/database.js"), DATABASE.to_string()),
        (root.join("src/routes/index.js"), ROUTES_INDEX.to_string()),
        (root.join("src/views/layouts/application.ejs"), LAYOUT.to_string()),
        (root.join("README.md"), readme(name)),
        (root.join(".gitignore"), GITIGNORE.to_string()),
        (root.join(".env"), ENV.to_string()),
        (
            root.join(MANIFEST_FILE),
            format!("{}\n", serde_json::to_string_pretty(&manifest(name))?),
        ),
    ];

    for (path, content) in files {
        fs::write(&path, content)?;
        debug!("Created {}", path.display());
    }

    Ok(ProjectLayout::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_project_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = create_project(dir.path(), "shop").unwrap();

        assert_eq!(layout.root(), dir.path().join("shop"));
        for d in PROJECT_DIRS {
            assert!(layout.root().join(d).is_dir(), "missing {}", d);
        }
        assert!(layout.routes_index_path().is_file());
        assert!(layout.root().join(".env").is_file());

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(layout.manifest_path()).unwrap()).unwrap();
        assert_eq!(manifest["name"], "shop");
        assert_eq!(manifest["scripts"]["start"], "node server.js");
        assert!(manifest["dependencies"].get("mongoose").is_some());
        assert!(manifest["devDependencies"].get("nodemon").is_some());
    }

    #[test]
    fn test_create_project_refuses_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("shop")).unwrap();
        fs::write(dir.path().join("shop/notes.txt"), "keep").unwrap();

        assert!(matches!(
            create_project(dir.path(), "shop"),
            Err(ExpmvcError::AlreadyExists(_))
        ));
        assert!(!dir.path().join("shop/server.js").exists());
    }

    #[test]
    fn test_manifest_key_order() {
        let text = serde_json::to_string(&manifest("app")).unwrap();
        let deps = text.find("\"dependencies\"").unwrap();
        let dev = text.find("\"devDependencies\"").unwrap();
        assert!(text.find("\"name\"").unwrap() < deps);
        assert!(deps < dev);
    }
}
