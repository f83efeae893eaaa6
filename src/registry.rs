use crate::box_types::*;
use crate::boxes::{BoxHeader, Decode, FourCC, Framed, HeaderForm, Mp4Atom};
use crate::error::Result;
use crate::known_boxes::KnownBox;
use crate::parser::BoxReader;
use std::io::Write;

macro_rules! box_registry {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Every decodable box, plus `Unknown` for opaque passthrough.
        #[derive(Debug, Clone, PartialEq, serde::Serialize)]
        #[serde(tag = "kind", rename_all = "lowercase")]
        pub enum Mp4Box {
            $($variant($ty),)*
        }

        impl Mp4Atom for Mp4Box {
            fn box_type(&self) -> FourCC {
                match self { $(Mp4Box::$variant(b) => b.box_type(),)* }
            }

            fn payload_size(&self) -> u64 {
                match self { $(Mp4Box::$variant(b) => b.payload_size(),)* }
            }

            fn encode_payload(&self, w: &mut dyn Write) -> Result<()> {
                match self { $(Mp4Box::$variant(b) => b.encode_payload(w),)* }
            }

            fn children(&self) -> Vec<&dyn Mp4Atom> {
                match self { $(Mp4Box::$variant(b) => b.children(),)* }
            }

            fn summary(&self) -> String {
                match self { $(Mp4Box::$variant(b) => b.summary(),)* }
            }

            fn children_start(&self) -> u64 {
                match self { $(Mp4Box::$variant(b) => b.children_start(),)* }
            }
        }

        impl Framed for Mp4Box {
            fn header_form(&self) -> HeaderForm {
                match self { $(Mp4Box::$variant(b) => b.header_form(),)* }
            }
        }

        $(
            impl Framed for $ty {
                fn header_form(&self) -> HeaderForm {
                    self.header_form
                }
            }

            impl From<$ty> for Mp4Box {
                fn from(b: $ty) -> Self {
                    Mp4Box::$variant(b)
                }
            }
        )*
    };
}

box_registry! {
    // ftyp and styp share a layout, as do free and skip.
    Ftyp(FtypBox),
    Free(FreeBox),
    Mdat(MdatBox),
    Pdin(PdinBox),
    Moov(MoovBox),
    Mvhd(MvhdBox),
    Iods(IodsBox),
    Trak(TrakBox),
    Tkhd(TkhdBox),
    Edts(EdtsBox),
    Elst(ElstBox),
    Mdia(MdiaBox),
    Mdhd(MdhdBox),
    Hdlr(HdlrBox),
    Minf(MinfBox),
    Vmhd(VmhdBox),
    Smhd(SmhdBox),
    Dinf(DinfBox),
    Dref(DrefBox),
    Url(UrlBox),
    Stbl(StblBox),
    Stsd(StsdBox),
    Stts(SttsBox),
    Ctts(CttsBox),
    Stsc(StscBox),
    Stsz(StszBox),
    Stco(StcoBox),
    Co64(Co64Box),
    Stss(StssBox),
    Sbgp(SbgpBox),
    Sgpd(SgpdBox),
    Mvex(MvexBox),
    Mehd(MehdBox),
    Trex(TrexBox),
    Moof(MoofBox),
    Mfhd(MfhdBox),
    Traf(TrafBox),
    Tfhd(TfhdBox),
    Tfdt(TfdtBox),
    Trun(TrunBox),
    Mfra(MfraBox),
    Tfra(TfraBox),
    Mfro(MfroBox),
    Sidx(SidxBox),
    Meta(MetaBox),
    Udta(UdtaBox),
    Cprt(CprtBox),
    Bxml(BxmlBox),
    Iloc(IlocBox),
    Unknown(UnknownBox),
}

impl Mp4Box {
    /// Decodes the box described by `h` from a reader bounded to its payload.
    ///
    /// Types without a decoder are never an error: they come back as
    /// `Mp4Box::Unknown` holding the raw payload.
    pub fn decode(h: &BoxHeader, r: &mut BoxReader<'_>) -> Result<Self> {
        Ok(match KnownBox::from(h.typ) {
            KnownBox::Ftyp | KnownBox::Styp => FtypBox::decode(h, r)?.into(),
            KnownBox::Free | KnownBox::Skip => FreeBox::decode(h, r)?.into(),
            KnownBox::Mdat => MdatBox::decode(h, r)?.into(),
            KnownBox::Pdin => PdinBox::decode(h, r)?.into(),
            KnownBox::Moov => MoovBox::decode(h, r)?.into(),
            KnownBox::Mvhd => MvhdBox::decode(h, r)?.into(),
            KnownBox::Iods => IodsBox::decode(h, r)?.into(),
            KnownBox::Trak => TrakBox::decode(h, r)?.into(),
            KnownBox::Tkhd => TkhdBox::decode(h, r)?.into(),
            KnownBox::Edts => EdtsBox::decode(h, r)?.into(),
            KnownBox::Elst => ElstBox::decode(h, r)?.into(),
            KnownBox::Mdia => MdiaBox::decode(h, r)?.into(),
            KnownBox::Mdhd => MdhdBox::decode(h, r)?.into(),
            KnownBox::Hdlr => HdlrBox::decode(h, r)?.into(),
            KnownBox::Minf => MinfBox::decode(h, r)?.into(),
            KnownBox::Vmhd => VmhdBox::decode(h, r)?.into(),
            KnownBox::Smhd => SmhdBox::decode(h, r)?.into(),
            KnownBox::Dinf => DinfBox::decode(h, r)?.into(),
            KnownBox::Dref => DrefBox::decode(h, r)?.into(),
            KnownBox::Url => UrlBox::decode(h, r)?.into(),
            KnownBox::Stbl => StblBox::decode(h, r)?.into(),
            KnownBox::Stsd => StsdBox::decode(h, r)?.into(),
            KnownBox::Stts => SttsBox::decode(h, r)?.into(),
            KnownBox::Ctts => CttsBox::decode(h, r)?.into(),
            KnownBox::Stsc => StscBox::decode(h, r)?.into(),
            KnownBox::Stsz => StszBox::decode(h, r)?.into(),
            KnownBox::Stco => StcoBox::decode(h, r)?.into(),
            KnownBox::Co64 => Co64Box::decode(h, r)?.into(),
            KnownBox::Stss => StssBox::decode(h, r)?.into(),
            KnownBox::Sbgp => SbgpBox::decode(h, r)?.into(),
            KnownBox::Sgpd => SgpdBox::decode(h, r)?.into(),
            KnownBox::Mvex => MvexBox::decode(h, r)?.into(),
            KnownBox::Mehd => MehdBox::decode(h, r)?.into(),
            KnownBox::Trex => TrexBox::decode(h, r)?.into(),
            KnownBox::Moof => MoofBox::decode(h, r)?.into(),
            KnownBox::Mfhd => MfhdBox::decode(h, r)?.into(),
            KnownBox::Traf => TrafBox::decode(h, r)?.into(),
            KnownBox::Tfhd => TfhdBox::decode(h, r)?.into(),
            KnownBox::Tfdt => TfdtBox::decode(h, r)?.into(),
            KnownBox::Trun => TrunBox::decode(h, r)?.into(),
            KnownBox::Mfra => MfraBox::decode(h, r)?.into(),
            KnownBox::Tfra => TfraBox::decode(h, r)?.into(),
            KnownBox::Mfro => MfroBox::decode(h, r)?.into(),
            KnownBox::Sidx => SidxBox::decode(h, r)?.into(),
            KnownBox::Meta => MetaBox::decode(h, r)?.into(),
            KnownBox::Udta => UdtaBox::decode(h, r)?.into(),
            KnownBox::Cprt => CprtBox::decode(h, r)?.into(),
            KnownBox::Bxml => BxmlBox::decode(h, r)?.into(),
            KnownBox::Iloc => IlocBox::decode(h, r)?.into(),
            KnownBox::Unknown(typ) => {
                tracing::debug!(%typ, size = h.size, offset = h.start, "no decoder, passing box through");
                UnknownBox::decode(h, r)?.into()
            }
        })
    }

    pub fn kind(&self) -> KnownBox {
        KnownBox::from(self.box_type())
    }
}
