//! 运行时错误.

use std::fmt;
use std::io;

/// 流水线运行时错误.
///
/// 所有错误都是致命的: 当前阶段中止, 不做重试, 也不保留部分结果.
#[derive(Debug)]
pub enum PipelineError {
    /// 配置错误, 例如数据供给器未找到任何文件.
    Configuration(String),

    /// 成对数据的形状不一致.
    ShapeMismatch {
        /// 出错位置的描述.
        context: String,

        /// 期望的形状.
        expected: Vec<usize>,

        /// 实际的形状.
        found: Vec<usize>,
    },

    /// 标签值超出类别范围, 无法 one-hot 编码.
    LabelOutOfRange {
        /// 出现的标签值.
        value: u8,

        /// 配置的类别数.
        n_class: usize,
    },

    /// 读写 NIfTI 文件错误.
    Nifti(nifti::NiftiError),

    /// 底层 I/O 错误.
    Io(io::Error),

    /// 读写划分文件错误.
    Csv(csv::Error),

    /// 非法的文件匹配模式.
    Pattern(glob::PatternError),

    /// 遍历匹配文件时出错.
    Glob(glob::GlobError),

    /// 写预览图错误.
    Image(image::ImageError),

    /// 外部模型返回的错误.
    Model(Box<dyn std::error::Error + Send + Sync>),

    /// 解析配置文件错误.
    #[cfg(feature = "serde")]
    Json(serde_json::Error),
}

/// 流水线运行结果.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// 构造形状不一致错误.
    pub fn shape_mismatch(context: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// 包装外部模型的错误.
    pub fn model<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> Self {
        Self::Model(e.into())
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "配置错误: {msg}"),
            Self::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "形状不一致 ({context}): 期望 {expected:?}, 实际 {found:?}"
            ),
            Self::LabelOutOfRange { value, n_class } => {
                write!(f, "标签值 `{value}` 超出类别范围 0..{n_class}")
            }
            Self::Nifti(e) => write!(f, "NIfTI 读写错误: {e}"),
            Self::Io(e) => write!(f, "I/O 错误: {e}"),
            Self::Csv(e) => write!(f, "划分文件错误: {e}"),
            Self::Pattern(e) => write!(f, "非法匹配模式: {e}"),
            Self::Glob(e) => write!(f, "文件遍历错误: {e}"),
            Self::Image(e) => write!(f, "预览图错误: {e}"),
            Self::Model(e) => write!(f, "模型错误: {e}"),
            #[cfg(feature = "serde")]
            Self::Json(e) => write!(f, "配置文件解析错误: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Nifti(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Pattern(e) => Some(e),
            Self::Glob(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Model(e) => Some(&**e),
            #[cfg(feature = "serde")]
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($variant: ident => $err: ty),+ $(,)?) => {
        $(
            impl From<$err> for PipelineError {
                #[inline]
                fn from(e: $err) -> Self {
                    Self::$variant(e)
                }
            }
        )+
    };
}

impl_from!(
    Nifti => nifti::NiftiError,
    Io => io::Error,
    Csv => csv::Error,
    Pattern => glob::PatternError,
    Glob => glob::GlobError,
    Image => image::ImageError,
);

#[cfg(feature = "serde")]
impl_from!(Json => serde_json::Error);

impl From<ndarray::ShapeError> for PipelineError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch {
            context: e.to_string(),
            expected: Vec::new(),
            found: Vec::new(),
        }
    }
}
