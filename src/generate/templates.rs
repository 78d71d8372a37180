//! Artifact templates
//!
//! Templates use `%Name%` (entity name as given), `%name%` (lowercased) and
//! `%names%` (lowercased plural) placeholders.

use crate::entity::{EntityDefinition, FieldKind};
use crate::layout::pluralize;

/// Substitute entity placeholders in a template
pub fn render(template: &str, entity: &str) -> String {
    let lower = entity.to_lowercase();
    template
        .replace("%Name%", entity)
        .replace("%names%", &pluralize(&lower))
        .replace("%name%", &lower)
}

const CONTROLLER: &str = r#"// %Name% Controller
const %name%Service = require('../services/%name%.service');

class %Name%Controller {
    async index(req, res) {
        try {
            const data = await %name%Service.getAll(req.query);
            res.json({ success: true, data });
        } catch (error) {
            res.status(500).json({ success: false, message: error.message });
        }
    }

    async show(req, res) {
        try {
            const data = await %name%Service.getById(req.params.id);
            if (!data) {
                return res.status(404).json({ success: false, message: '%Name% not found' });
            }
            res.json({ success: true, data });
        } catch (error) {
            res.status(500).json({ success: false, message: error.message });
        }
    }

    async store(req, res) {
        try {
            const data = await %name%Service.create(req.body);
            res.status(201).json({ success: true, data });
        } catch (error) {
            res.status(400).json({ success: false, message: error.message });
        }
    }

    async update(req, res) {
        try {
            const data = await %name%Service.update(req.params.id, req.body);
            if (!data) {
                return res.status(404).json({ success: false, message: '%Name% not found' });
            }
            res.json({ success: true, data });
        } catch (error) {
            res.status(400).json({ success: false, message: error.message });
        }
    }

    async destroy(req, res) {
        try {
            const deleted = await %name%Service.delete(req.params.id);
            if (!deleted) {
                return res.status(404).json({ success: false, message: '%Name% not found' });
            }
            res.json({ success: true, message: '%Name% deleted successfully' });
        } catch (error) {
            res.status(500).json({ success: false, message: error.message });
        }
    }
}

module.exports = new %Name%Controller();
"#;

const ROUTE: &str = r#"const express = require('express');
const router = express.Router();
const %name%Controller = require('../controllers/%name%.controller');
const validate = require('../validations/%name%.validation');

// GET all %names%
router.get('/', %name%Controller.index);

// GET single %Name%
router.get('/:id', validate.idParam, %name%Controller.show);

// POST create %Name%
router.post('/', validate.create, %name%Controller.store);

// PUT update %Name%
router.put('/:id', validate.idParam, validate.update, %name%Controller.update);

// DELETE %Name%
router.delete('/:id', validate.idParam, %name%Controller.destroy);

module.exports = router;
"#;

const SERVICE: &str = r#"const %Name% = require('../models/%name%.model');

class %Name%Service {
    async getAll(query = {}) {
        try {
            const { page = 1, limit = 10, sort = '-createdAt', populate = '', ...filters } = query;

            let queryBuilder = %Name%.find(filters);
            if (populate) {
                populate.split(',').forEach(field => {
                    queryBuilder = queryBuilder.populate(field);
                });
            }

            const %names% = await queryBuilder
                .sort(sort)
                .limit(limit * 1)
                .skip((page - 1) * limit);

            const total = await %Name%.countDocuments(filters);

            return {
                %names%,
                pagination: {
                    total,
                    page: parseInt(page),
                    limit: parseInt(limit),
                    pages: Math.ceil(total / limit)
                }
            };
        } catch (error) {
            throw new Error(`Error fetching %names%: ${error.message}`);
        }
    }

    async getById(id) {
        try {
            return await %Name%.findById(id);
        } catch (error) {
            throw new Error(`Error fetching %name%: ${error.message}`);
        }
    }

    async create(data) {
        try {
            const %name% = new %Name%(data);
            return await %name%.save();
        } catch (error) {
            throw new Error(`Error creating %name%: ${error.message}`);
        }
    }

    async update(id, data) {
        try {
            return await %Name%.findByIdAndUpdate(
                id,
                { $set: data },
                { new: true, runValidators: true }
            );
        } catch (error) {
            throw new Error(`Error updating %name%: ${error.message}`);
        }
    }

    async delete(id) {
        try {
            return await %Name%.findByIdAndDelete(id);
        } catch (error) {
            throw new Error(`Error deleting %name%: ${error.message}`);
        }
    }
%relation%}

module.exports = new %Name%Service();
"#;

// %Child% / %child% / %children% are the child entity of a hasMany relation
const SERVICE_RELATION: &str = r#"
    // %Child% relationship methods
    async add%Child%(%name%Id, %child%Id) {
        try {
            return await %Name%.findByIdAndUpdate(
                %name%Id,
                { $addToSet: { %children%: %child%Id } },
                { new: true }
            );
        } catch (error) {
            throw new Error(`Error adding %child%: ${error.message}`);
        }
    }

    async remove%Child%(%name%Id, %child%Id) {
        try {
            return await %Name%.findByIdAndUpdate(
                %name%Id,
                { $pull: { %children%: %child%Id } },
                { new: true }
            );
        } catch (error) {
            throw new Error(`Error removing %child%: ${error.message}`);
        }
    }
"#;

const VALIDATION: &str = r#"const Joi = require('joi');

const %name%Fields = {
%rules%
};

const respond = (res, error) => res.status(400).json({
    success: false,
    message: error.details[0].message
});

const %Name%Validation = {
    create: (req, res, next) => {
        const schema = Joi.object(%name%Fields).options({ presence: 'required' });
        const { error } = schema.validate(req.body);
        if (error) return respond(res, error);
        next();
    },

    update: (req, res, next) => {
        const schema = Joi.object(%name%Fields).options({ presence: 'optional' });
        const { error } = schema.validate(req.body);
        if (error) return respond(res, error);
        next();
    },

    idParam: (req, res, next) => {
        const schema = Joi.object({
            id: Joi.string().length(24).hex().required()
        });
        const { error } = schema.validate(req.params);
        if (error) {
            return res.status(400).json({ success: false, message: 'Invalid ID format' });
        }
        next();
    }
};

module.exports = %Name%Validation;
"#;

const VIEW: &str = r#"<h1>%Name% View</h1>
<p>This is the %Name% view file.</p>
"#;

pub fn controller(entity: &str) -> String {
    render(CONTROLLER, entity)
}

pub fn route(entity: &str) -> String {
    render(ROUTE, entity)
}

/// Service for `entity`; with `child`, adds add/remove helpers for a hasMany relation
pub fn service(entity: &str, child: Option<&str>) -> String {
    let relation = match child {
        Some(child) => {
            let lower = child.to_lowercase();
            SERVICE_RELATION
                .replace("%Child%", child)
                .replace("%children%", &pluralize(&lower))
                .replace("%child%", &lower)
        }
        None => String::new(),
    };
    render(&SERVICE.replace("%relation%", &relation), entity)
}

/// Joi validators derived from the entity's fields
pub fn validation(entity: &EntityDefinition) -> String {
    let rules = if entity.fields().is_empty() {
        "    // Add validation rules here".to_string()
    } else {
        entity
            .fields()
            .iter()
            .map(|f| {
                let rule = match (f.kind, f.is_many()) {
                    (FieldKind::ObjectId, true) => "Joi.array().items(Joi.string().length(24).hex())",
                    (FieldKind::ObjectId, false) => "Joi.string().length(24).hex()",
                    (FieldKind::String, _) => "Joi.string().trim()",
                    (FieldKind::Number, _) => "Joi.number()",
                    (FieldKind::Boolean, _) => "Joi.boolean()",
                    (FieldKind::Date, _) => "Joi.date()",
                    (FieldKind::Array, _) => "Joi.array()",
                };
                format!("    {}: {}", f.name, rule)
            })
            .collect::<Vec<_>>()
            .join(",\n")
    };
    render(&VALIDATION.replace("%rules%", &rules), entity.name())
}

pub fn view(entity: &str) -> String {
    render(VIEW, entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        assert_eq!(render("%Name%/%name%/%names%", "Category"), "Category/category/categories");
    }

    #[test]
    fn test_service_relation_methods() {
        let plain = service("Author", None);
        assert!(!plain.contains("addPost"));
        assert!(!plain.contains('%'));

        let related = service("Author", Some("Post"));
        assert!(related.contains("async addPost(authorId, postId)"));
        assert!(related.contains("{ $pull: { posts: postId } }"));
        assert!(!related.contains('%'));
    }

    #[test]
    fn test_validation_rules_follow_kinds() {
        let entity = EntityDefinition::from_args(
            "Post",
            &["title".to_string(), "views:number".to_string(), "author:objectid:User".to_string()],
        )
        .unwrap();
        let text = validation(&entity);
        assert!(text.contains("    title: Joi.string().trim(),\n    views: Joi.number(),\n    author: Joi.string().length(24).hex()\n"));
        assert!(text.contains("const PostValidation = {"));
    }

    #[test]
    fn test_controller_and_route() {
        let c = controller("User");
        assert!(c.contains("const userService = require('../services/user.service');"));
        let r = route("User");
        assert!(r.contains("// GET all users"));
        assert!(r.contains("router.post('/', validate.create, userController.store);"));
    }
}
