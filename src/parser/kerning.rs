//! Kerning classes, mapped onto UFO-style kerning groups.
//!
//! FontForge kerning classes are free-form: the same glyph can sit in any
//! number of classes. UFO groups are not, so every glyph gets one primary
//! group per side (first appearance wins) and class pairs whose membership
//! no longer matches their group degrade to explicit glyph pairs.

use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::font::Font;

/// One parsed `KernClass2` subtable: group members on both sides and the
/// row-major kerning matrix. Index zero on each side is the implicit empty
/// class FontForge never writes out.
#[derive(Debug, Clone)]
pub(super) struct KernClass {
    pub(super) first: Vec<Option<Vec<SmolStr>>>,
    pub(super) second: Vec<Option<Vec<SmolStr>>>,
    pub(super) kerns: Vec<i32>,
}

fn unique_group_name(base: String, seen: &mut HashMap<SmolStr, usize>) -> SmolStr {
    let base = SmolStr::from(base);
    let entry = seen.entry(base.clone()).or_default();
    *entry += 1;
    if *entry == 1 {
        base
    } else {
        SmolStr::from(format!("{base}.{entry}"))
    }
}

fn push_group_member(groups: &mut IndexMap<SmolStr, Vec<SmolStr>>, group: &SmolStr, glyph: &SmolStr) {
    let entry = groups.entry(group.clone()).or_default();
    if !entry.contains(glyph) {
        entry.push(glyph.clone());
    }
}

/// Applies every kerning class subtable to the font, in lookup order.
///
/// Groups are named `public.kern1.<first member>` and
/// `public.kern2.<first member>`, uniquified with a numeric suffix when two
/// classes share a first member. Kern values of zero are not recorded.
pub(super) fn process_kern_classes(font: &mut Font, tables: &[&KernClass]) {
    let mut left_primary: HashMap<SmolStr, SmolStr> = HashMap::new();
    let mut right_primary: HashMap<SmolStr, SmolStr> = HashMap::new();
    let mut groups: IndexMap<SmolStr, Vec<SmolStr>> = IndexMap::new();
    let mut name_counts: HashMap<SmolStr, usize> = HashMap::new();
    let mut first_names: Vec<Vec<Option<SmolStr>>> = Vec::new();
    let mut second_names: Vec<Vec<Option<SmolStr>>> = Vec::new();

    // Pass 1: name the groups and assign each glyph its primary group.
    for class in tables {
        let mut names = vec![None; class.first.len()];
        for (i, members) in class.first.iter().enumerate() {
            let Some(members) = members else { continue };
            let Some(head) = members.first() else { continue };
            let name = unique_group_name(format!("public.kern1.{head}"), &mut name_counts);
            for glyph in members {
                if !left_primary.contains_key(glyph) {
                    left_primary.insert(glyph.clone(), name.clone());
                    push_group_member(&mut groups, &name, glyph);
                }
            }
            names[i] = Some(name);
        }
        first_names.push(names);

        let mut names = vec![None; class.second.len()];
        for (j, members) in class.second.iter().enumerate() {
            let Some(members) = members else { continue };
            let Some(head) = members.first() else { continue };
            let name = unique_group_name(format!("public.kern2.{head}"), &mut name_counts);
            for glyph in members {
                if !right_primary.contains_key(glyph) {
                    right_primary.insert(glyph.clone(), name.clone());
                    push_group_member(&mut groups, &name, glyph);
                }
            }
            names[j] = Some(name);
        }
        second_names.push(names);
    }

    // Pass 2: apply the matrices, degrading sides whose membership is not
    // fully primary.
    for (t, class) in tables.iter().enumerate() {
        let cols = class.second.len().max(1);
        for (i, members1) in class.first.iter().enumerate() {
            let Some(members1) = members1 else { continue };
            if members1.is_empty() {
                continue;
            }
            for (j, members2) in class.second.iter().enumerate() {
                let Some(&value) = class.kerns.get(i * cols + j) else {
                    break;
                };
                if value == 0 {
                    continue;
                }
                let Some(members2) = members2 else { continue };
                if members2.is_empty() {
                    continue;
                }

                let left_targets: Vec<SmolStr> = match first_names[t][i].as_ref() {
                    Some(name)
                        if members1
                            .iter()
                            .all(|glyph| left_primary.get(glyph) == Some(name)) =>
                    {
                        vec![name.clone()]
                    }
                    _ => members1.clone(),
                };
                let right_targets: Vec<SmolStr> = match second_names[t][j].as_ref() {
                    Some(name)
                        if members2
                            .iter()
                            .all(|glyph| right_primary.get(glyph) == Some(name)) =>
                    {
                        vec![name.clone()]
                    }
                    _ => members2.clone(),
                };

                for left in &left_targets {
                    for right in &right_targets {
                        font.set_kern(left.clone(), right.clone(), value);
                    }
                }
            }
        }
    }

    font.groups.extend(groups);
}
