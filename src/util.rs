use crate::boxes::{FourCC, Mp4Atom};
use crate::known_boxes::KnownBox;

/// A box found by [`find_boxes`], with its offset in the encoded file.
pub struct Located<'a> {
    pub offset: u64,
    pub atom: &'a dyn Mp4Atom,
}

/// Depth-first search for every box of type `typ` under `roots`, which are
/// laid out back to back starting at offset 0.
pub fn find_boxes<'a>(roots: &[&'a dyn Mp4Atom], typ: FourCC) -> Vec<Located<'a>> {
    fn walk<'a>(b: &'a dyn Mp4Atom, offset: u64, typ: FourCC, out: &mut Vec<Located<'a>>) {
        if b.box_type() == typ {
            out.push(Located { offset, atom: b });
        }
        let children = b.children();
        let mut child_offset = offset + b.children_start();
        for c in children {
            walk(c, child_offset, typ, out);
            child_offset += c.size();
        }
    }

    let mut out = Vec::new();
    let mut offset = 0;
    for b in roots {
        walk(*b, offset, typ, &mut out);
        offset += b.size();
    }
    out
}

/// One-line description of `b` given its encoded payload: the box name, plus
/// version and flags for a full box or the child count for a container.
pub fn describe(b: &dyn Mp4Atom, payload: &[u8]) -> String {
    let kind = KnownBox::from(b.box_type());
    let mut line = format!("{} ({})", b.box_type(), kind.full_name());
    if kind.is_full_box() {
        if let [version, f0, f1, f2, ..] = *payload {
            let flags = u32::from_be_bytes([0, f0, f1, f2]);
            line.push_str(&format!(" version={version} flags={flags:#08x}"));
        }
    }
    if kind.is_container() {
        line.push_str(&format!(" children={}", b.children().len()));
    }
    line
}
