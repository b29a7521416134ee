//! 命名参数编译
//!
//! 把 `:name` 形式的命名参数转换为驱动占位符（MySQL/SQLite 为 `?`，PostgreSQL 为 `$n`），
//! 并按出现顺序生成绑定值列表。
//!
//! 规则：
//! - 参数名由字母、数字、`_`、`$` 组成；开启 `allow_sharp` 后也允许 `#`
//! - 前一个字符是单词字符、`:` 或 `\` 时，`:` 按字面处理（如 `12:30`、`::int`）
//! - `\:` 输出字面量 `:`
//! - 值为 [`BindValue::Null`] 的参数直接写成 `NULL`，不生成占位符
//! - 单引号字符串、双引号/反引号标识符、`--` 与 `/* */` 注释内不做替换；
//!   MySQL 的引号内 `\` 转义下一个字符

use crate::bind_value::{BindValue, Params};
use crate::db_pool::DbDriver;
use crate::error::{DbHelperError, Result};

/// 编译后的 SQL：驱动占位符 + 按顺序排列的绑定值
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// 参数名分词规则，进程内构造一次后复用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamStyle {
    pub allow_sharp: bool,
}

impl Default for ParamStyle {
    fn default() -> Self {
        Self { allow_sharp: true }
    }
}

impl ParamStyle {
    fn is_name_char(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '$' || (self.allow_sharp && ch == '#')
    }

    /// 编译命名参数
    pub fn compile(&self, sql: &str, params: &Params, driver: DbDriver) -> Result<CompiledSql> {
        let chars: Vec<char> = sql.chars().collect();
        let mut out = String::with_capacity(sql.len());
        let mut binds = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            match ch {
                '\'' | '"' | '`' => {
                    let end = skip_quoted(&chars, i, ch, driver == DbDriver::MySql);
                    out.extend(&chars[i..end]);
                    i = end;
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    let end = chars[i..]
                        .iter()
                        .position(|&c| c == '\n')
                        .map(|p| i + p)
                        .unwrap_or(chars.len());
                    out.extend(&chars[i..end]);
                    i = end;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    let end = find_block_comment_end(&chars, i + 2);
                    out.extend(&chars[i..end]);
                    i = end;
                }
                '\\' if chars.get(i + 1) == Some(&':') => {
                    out.push(':');
                    i += 2;
                }
                ':' => {
                    let prev = if i > 0 { Some(chars[i - 1]) } else { None };
                    let literal = match prev {
                        Some(p) => p == ':' || p == '\\' || p.is_alphanumeric() || p == '_',
                        None => false,
                    };
                    if literal || chars.get(i + 1) == Some(&':') {
                        out.push(ch);
                        i += 1;
                        continue;
                    }

                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && self.is_name_char(chars[end]) {
                        end += 1;
                    }
                    if end == start {
                        out.push(ch);
                        i += 1;
                        continue;
                    }

                    let name: String = chars[start..end].iter().collect();
                    let value = params
                        .get(&name)
                        .ok_or_else(|| DbHelperError::MissingParam(name.clone()))?;
                    // 无类型的 NULL 绑定在 PostgreSQL 上会被当作 TEXT
                    if value.is_null() {
                        out.push_str("NULL");
                    } else {
                        out.push_str(&driver.placeholder(binds.len()));
                        binds.push(value.clone());
                    }
                    i = end;
                }
                _ => {
                    out.push(ch);
                    i += 1;
                }
            }
        }

        Ok(CompiledSql { sql: out, binds })
    }
}

/// 返回引号结束位置之后的下标；连续两个引号视为转义
fn skip_quoted(chars: &[char], start: usize, quote: char, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if backslash_escapes && chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}
