use serde::{Deserialize, Serialize};

pub mod length_input;

pub use length_input::{parse_length_mm, LengthInputError};

/// 2D-точка в рабочих единицах сессии (пиксели, единицы файла или мм)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Расстояние до другой точки
    pub fn distance(&self, other: Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Обе координаты конечны (не NaN и не бесконечность)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Отрезок из векторного чертежа, оба конца в одних единицах
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: Point2D,
    pub end: Point2D,
}

impl RawSegment {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            start: Point2D::new(x1, y1),
            end: Point2D::new(x2, y2),
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Единицы измерения длины
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Millimeters,
    Centimeters,
    Meters,
    Inches,
}

impl Units {
    /// Сокращение для отображения
    pub fn abbrev(&self) -> &'static str {
        match self {
            Units::Millimeters => "mm",
            Units::Centimeters => "cm",
            Units::Meters => "m",
            Units::Inches => "in",
        }
    }

    /// Коэффициент перевода в миллиметры
    pub fn to_mm(&self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Centimeters => 10.0,
            Units::Meters => 1000.0,
            Units::Inches => 25.4,
        }
    }

    /// Распознать суффикс единиц ("mm", "cm", "m", "in")
    pub fn from_suffix(suffix: &str) -> Option<Units> {
        match suffix.trim().to_ascii_lowercase().as_str() {
            "mm" => Some(Units::Millimeters),
            "cm" => Some(Units::Centimeters),
            "m" => Some(Units::Meters),
            "in" | "\"" => Some(Units::Inches),
            _ => None,
        }
    }

    /// Форматировать длину в мм в этих единицах
    pub fn format_mm(&self, length_mm: f64, precision: usize) -> String {
        format!("{:.*} {}", precision, length_mm / self.to_mm(), self.abbrev())
    }

    /// Все доступные единицы
    pub fn all() -> &'static [Units] {
        &[Units::Millimeters, Units::Centimeters, Units::Meters, Units::Inches]
    }
}

/// Подсказка размера, извлечённая извне (OCR/vision).
/// Используется только как значение по умолчанию для ручного ввода.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionHint {
    /// Индекс сегмента периметра
    pub segment_index: usize,
    /// Длина в миллиметрах
    pub length_mm: f64,
    /// Уверенность распознавания (0.0 - 1.0), если известна
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Стена периметра для калькулятора материалов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallEdge {
    /// Метка стены ("A", "B", ... "AA")
    pub label: String,
    /// Длина стены в миллиметрах
    pub length_mm: f64,
}

/// Итоговый контур здания в миллиметрах
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Footprint {
    /// Вершины в порядке обхода против часовой стрелки
    pub vertices_mm: Vec<Point2D>,
    /// Стены в том же порядке обхода
    pub walls: Vec<WallEdge>,
    /// Площадь, мм²
    pub area_mm2: f64,
    /// Периметр, мм
    pub perimeter_mm: f64,
}

impl Footprint {
    /// Площадь в квадратных метрах
    pub fn area_m2(&self) -> f64 {
        self.area_mm2 / 1_000_000.0
    }

    /// Суммарная длина стен по меткам (с учётом ручных размеров)
    pub fn total_wall_length_mm(&self) -> f64 {
        self.walls.iter().map(|w| w.length_mm).sum()
    }
}
