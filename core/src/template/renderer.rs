//! SQL 模板渲染

use handlebars::{handlebars_helper, Handlebars, Template};
use serde_json::Value;

use crate::error::{DbHelperError, Result};

/// 可替换的模板引擎：`render(源码, 上下文) -> SQL`
pub trait SqlRenderer: Send + Sync {
    fn render(&self, query_id: &str, source: &str, context: &Value) -> Result<String>;
}

// (max(pageNum, 1) - 1) * max(pageSize, 0)，溢出时取 i64::MAX
handlebars_helper!(page_offset: |page_num: i64, page_size: i64| {
    offset(page_num, page_size)
});

fn offset(page_num: i64, page_size: i64) -> i64 {
    (page_num.max(1) - 1).saturating_mul(page_size.max(0))
}

/// 基于 handlebars 的渲染器
///
/// 关闭了 HTML 转义，`{{order_by}}` 之类的片段按原样输出。
/// 内置 `page_offset pageNum pageSize` helper 用于计算分页偏移量。
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("page_offset", Box::new(page_offset));
        Self { registry }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlRenderer for HandlebarsRenderer {
    fn render(&self, query_id: &str, source: &str, context: &Value) -> Result<String> {
        Template::compile(source).map_err(|e| DbHelperError::TemplateSyntax {
            query_id: query_id.to_string(),
            message: e.to_string(),
        })?;
        self.registry
            .render_template(source, context)
            .map_err(|e| DbHelperError::TemplateRender {
                query_id: query_id.to_string(),
                message: e.to_string(),
            })
    }
}
